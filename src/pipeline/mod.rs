//! `CheckPipeline`: the per-PR driver. Runs under a `RepoQueue`
//! worker; fetches the PR's manifests, fans a configurable list of
//! [`CheckProcessor`]s out across every affected application, and feeds
//! results back into a [`Message`].

pub mod processors;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::comment::{BuildCommentParams, Message};
use crate::model::{Application, CheckResult, CommitState, PullRequest};
use crate::repo::index::ChangedFile;
use crate::resolver::AffectedResolver;
use crate::repo::RepoIndex;
use crate::vcs::VcsClient;

/// Bundles everything a [`CheckProcessor`] needs for one application.
pub struct CheckRequestCtx<'a> {
    pub pull_request: &'a PullRequest,
    pub application: &'a Application,
    pub yaml_manifests: &'a [String],
    pub json_manifests: &'a [serde_json::Value],
    /// The application's manifests as rendered against `base_ref` today —
    /// the "current" tree the diff processor compares `yaml_manifests`
    /// (the "proposed" tree) against. Empty when the renderer has no
    /// baseline (e.g. the application didn't exist on the base branch).
    pub base_yaml_manifests: &'a [String],
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("{0}")]
    Other(String),
}

/// A registered check. Errors are folded into `Result{state: Error}` by the
/// pipeline; intentional no-ops return `state: Skip` or
/// `no_changes_detected: true`.
#[async_trait]
pub trait CheckProcessor: Send + Sync {
    fn name(&self) -> &str;
    async fn process(&self, ctx: &CheckRequestCtx<'_>) -> Result<CheckResult, ProcessorError>;
}

/// Renders the manifest tree for one application. An external collaborator
/// (the Argo-CD repo-server invocation) behind a narrow trait so the
/// pipeline's control flow is independent of how rendering actually
/// happens.
#[async_trait]
pub trait ManifestRenderer: Send + Sync {
    /// Renders the application's manifests as they would look with the PR
    /// applied (the "proposed" tree).
    async fn render(&self, pull_request: &PullRequest, app: &Application) -> Result<RenderedManifests, ProcessorError>;

    /// Renders the application's manifests as they exist on `base_ref`
    /// today (the "current" tree the diff processor needs).
    /// Default: no baseline available, so the diff processor reports the
    /// whole proposed tree as new rather than failing the unit.
    async fn render_base(&self, _pull_request: &PullRequest, _app: &Application) -> Result<RenderedManifests, ProcessorError> {
        Ok(RenderedManifests::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderedManifests {
    pub yaml: Vec<String>,
    pub json: Vec<serde_json::Value>,
}

/// Fetches the PR's changed-file list and full file tree. External
/// collaborator (git/archive transport).
#[async_trait]
pub trait RepoSource: Send + Sync {
    async fn changed_files(&self, pull_request: &PullRequest) -> Result<Vec<ChangedFile>, ProcessorError>;
    async fn all_files(&self, pull_request: &PullRequest) -> Result<Vec<String>, ProcessorError>;
}

/// Dependency bundle shared across every pipeline run: the repo index,
/// resolver, VCS client, rendering and file-fetching collaborators, and the
/// registered check processors.
pub struct PipelineDeps {
    pub repo_index: Arc<RepoIndex>,
    pub resolver: Arc<AffectedResolver>,
    pub repo_source: Arc<dyn RepoSource>,
    pub renderer: Arc<dyn ManifestRenderer>,
    pub vcs: Arc<dyn VcsClient>,
    pub processors: Vec<Arc<dyn CheckProcessor>>,
    pub worker_parallelism: usize,
    pub identifier: String,
    pub max_comment_length: usize,
    pub show_debug_info: bool,
    pub label_filter: Vec<String>,
}

/// Runs the full per-PR check flow and returns the final `Message`
/// (already posted/updated via the VCS client).
pub async fn run(deps: Arc<PipelineDeps>, pull_request: PullRequest) -> Result<Arc<Message>, ProcessorError> {
    let changed = deps.repo_source.changed_files(&pull_request).await?;
    let all_files = deps.repo_source.all_files(&pull_request).await?;

    let affected = deps.resolver.resolve(
        &deps.repo_index,
        &pull_request.clone_url,
        &pull_request.name,
        &changed,
        &all_files,
        &pull_request.base_ref,
    );

    let initial_chunks = vec!["Running checks…".to_string()];
    let message = deps
        .vcs
        .post_message(&pull_request, &initial_chunks)
        .await
        .map_err(|e| ProcessorError::Other(e.to_string()))?;
    let message = Arc::new(message);

    deps.vcs
        .commit_status(&pull_request, CommitState::Running)
        .await
        .map_err(|e| ProcessorError::Other(e.to_string()))?;

    for app in &affected.apps {
        message.add_new_app(app.name.to_string());
    }

    let semaphore = Arc::new(Semaphore::new(deps.worker_parallelism.max(1)));
    let mut handles = Vec::with_capacity(affected.apps.len());
    for app in affected.apps.clone() {
        let deps = deps.clone();
        let pr = pull_request.clone();
        let message = message.clone();
        let semaphore = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            run_app_unit(deps, pr, app, message).await;
        }));
    }

    for handle in handles {
        if let Err(join_err) = handle.await {
            warn!(?join_err, "per-app check unit failed to join");
        }
    }

    let params = BuildCommentParams {
        sha: &pull_request.sha,
        label_filter: &deps.label_filter,
        show_debug: deps.show_debug_info,
        identifier: &deps.identifier,
        apps_checked: message.app_count(),
        total_checked: message.total_result_count(),
        max_comment_length: deps.max_comment_length,
        pr_link_template: &deps.vcs.get_pr_comment_link_template(&pull_request),
        pod_hostname: None,
        wall_duration: None,
    };
    let final_chunks = message.build_comment(&params);
    deps.vcs
        .update_message(&pull_request, &message, &final_chunks)
        .await
        .map_err(|e| ProcessorError::Other(e.to_string()))?;

    deps.vcs
        .commit_status(&pull_request, message.worst_state())
        .await
        .map_err(|e| ProcessorError::Other(e.to_string()))?;

    Ok(message)
}

/// One application's independent unit of work: render,
/// run every processor in order, feed results back. Caught by
/// `catch_unwind` so a panic in one app never takes down the others
/// (surfaced as a `Panic` result).
async fn run_app_unit(deps: Arc<PipelineDeps>, pr: PullRequest, app: Application, message: Arc<Message>) {
    let app_name = app.name.clone();
    let outcome = AssertUnwindSafe(run_app_unit_inner(deps, pr, app, message.clone()))
        .catch_unwind()
        .await;
    if let Err(panic) = outcome {
        warn!(app = %app_name, ?panic, "check unit panicked");
        message.add_to_app_message(
            app_name.to_string(),
            CheckResult::new(CommitState::Panic, "internal error", "the check runner panicked"),
        );
    }
}

async fn run_app_unit_inner(deps: Arc<PipelineDeps>, pr: PullRequest, app: Application, message: Arc<Message>) {
    let rendered = match deps.renderer.render(&pr, &app).await {
        Ok(r) => r,
        Err(err) => {
            message.add_to_app_message(
                app.name.to_string(),
                CheckResult::error("manifest render failed", err.to_string()),
            );
            return;
        }
    };
    let rendered_base = match deps.renderer.render_base(&pr, &app).await {
        Ok(r) => r,
        Err(err) => {
            warn!(app = %app.name, %err, "base-tree render failed, diff processor will see an empty baseline");
            RenderedManifests::default()
        }
    };

    let ctx = CheckRequestCtx {
        pull_request: &pr,
        application: &app,
        yaml_manifests: &rendered.yaml,
        json_manifests: &rendered.json,
        base_yaml_manifests: &rendered_base.yaml,
    };

    for processor in &deps.processors {
        let result = match processor.process(&ctx).await {
            Ok(r) => r,
            Err(err) => CheckResult::error(processor.name().to_string(), err.to_string()),
        };
        message.add_to_app_message(app.name.to_string(), result);
    }
    info!(app = %app.name, "check unit finished");
}
