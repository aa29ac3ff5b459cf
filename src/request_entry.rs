//! `RequestEntry`: the top-level webhook handler.
//!
//! Validates the signature, parses the hook into a [`PullRequest`], and
//! hands the whole check run off to the [`RepoQueueManager`] as a single
//! boxed unit of work. Everything after `enqueue` runs on a background
//! task independent of the HTTP request.

use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::{info, warn};

use crate::error::{GateError, GateResult};
use crate::pipeline::{self, PipelineDeps};
use crate::queue::{BoxedWork, QueueError, RepoQueueManager};
use crate::repo::RepoUrl;
use crate::vcs::{HookEvent, VcsClient, VcsError};

/// Everything `RequestEntry` needs to validate, route, and enqueue one
/// webhook delivery. Held behind an `Arc` and cloned cheaply per request.
pub struct RequestEntry {
    vcs: Arc<dyn VcsClient>,
    queue: Arc<RepoQueueManager>,
    pipeline_deps: Arc<PipelineDeps>,
    webhook_secret: String,
}

impl RequestEntry {
    #[must_use]
    pub fn new(
        vcs: Arc<dyn VcsClient>,
        queue: Arc<RepoQueueManager>,
        pipeline_deps: Arc<PipelineDeps>,
        webhook_secret: String,
    ) -> Self {
        Self {
            vcs,
            queue,
            pipeline_deps,
            webhook_secret,
        }
    }

    /// Handle one webhook delivery.
    ///
    /// Returns `Ok(())` for deliveries that are accepted *and* for event
    /// kinds outside the required set — both render
    /// as `200 OK` to the VCS so it doesn't retry. Every other error maps
    /// to a response status via [`GateError::into_response`].
    pub async fn handle_webhook(&self, event_type: &str, headers: &HeaderMap, body: &[u8]) -> GateResult<()> {
        let verified = self
            .vcs
            .verify_hook(headers, body, &self.webhook_secret)
            .map_err(Self::map_vcs_error)?;

        let parsed = match self.vcs.parse_hook(event_type, &verified).await {
            Ok(parsed) => parsed,
            Err(VcsError::InvalidType) => {
                info!(event_type, "ignoring webhook event outside the required set");
                return Ok(());
            }
            Err(err) => return Err(Self::map_vcs_error(err)),
        };

        let pull_request = parsed.pull_request;
        if matches!(parsed.event, HookEvent::ReplanComment) {
            info!(full_name = %pull_request.full_name, check_id = pull_request.check_id, "replan triggered by comment");
        }

        let repo_key = RepoUrl::parse(&pull_request.clone_url)
            .ok_or_else(|| GateError::InvalidRepoUrl(pull_request.clone_url.clone()))?;
        let repo_key = format!("{}/{}", repo_key.host, repo_key.path);

        let deps = self.pipeline_deps.clone();
        let full_name = pull_request.full_name.clone();
        let check_id = pull_request.check_id;
        let work: BoxedWork = Box::new(move |pr| {
            Box::pin(async move {
                if let Err(err) = pipeline::run(deps, pr).await {
                    warn!(full_name, check_id, %err, "check pipeline failed");
                }
            })
        });

        self.queue
            .enqueue(repo_key.clone(), pull_request, work)
            .await
            .map_err(|err| match err {
                QueueError::Full { repo_key } => GateError::QueueFull { repo_key },
            })
    }

    fn map_vcs_error(err: VcsError) -> GateError {
        match err {
            VcsError::InvalidType => GateError::UnsupportedEvent,
            VcsError::InvalidSignature => GateError::InvalidSignature,
            VcsError::MalformedPayload(msg) => GateError::MalformedPayload(msg),
            VcsError::Transport(err) => GateError::Vcs(err),
        }
    }
}
