//! Optional AI summary: a prose recap of what changed, generated by
//! an LLM client. The client itself is an excluded external collaborator
//! from this crate, so only the [`Summarizer`] seam and a thin adapter ship here.

use async_trait::async_trait;

use crate::model::{CheckResult, CommitState};

use super::super::{CheckProcessor, CheckRequestCtx, ProcessorError};

/// Produces a natural-language summary of a manifest diff. Implemented
/// out-of-crate by an LLM client adapter; the only in-crate implementation
/// is a test double.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, old: &[String], new: &[String]) -> Result<Option<String>, ProcessorError>;
}

/// Never produces a summary. Stands in for the real adapter so the pipeline
/// can be wired and exercised without an LLM client configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSummarizer;

#[async_trait]
impl Summarizer for NullSummarizer {
    async fn summarize(&self, _old: &[String], _new: &[String]) -> Result<Option<String>, ProcessorError> {
        Ok(None)
    }
}

/// The registered "summary" check: `Skip` when there's nothing to
/// say, otherwise a `Success` result carrying the summarizer's prose.
pub struct SummaryProcessor {
    summarizer: Box<dyn Summarizer>,
}

impl SummaryProcessor {
    #[must_use]
    pub fn new(summarizer: impl Summarizer + 'static) -> Self {
        Self {
            summarizer: Box::new(summarizer),
        }
    }
}

impl Default for SummaryProcessor {
    fn default() -> Self {
        Self::new(NullSummarizer)
    }
}

#[async_trait]
impl CheckProcessor for SummaryProcessor {
    fn name(&self) -> &str {
        "summary"
    }

    async fn process(&self, ctx: &CheckRequestCtx<'_>) -> Result<CheckResult, ProcessorError> {
        match self.summarizer.summarize(ctx.base_yaml_manifests, ctx.yaml_manifests).await? {
            None => Ok(CheckResult::skip("no summary available")),
            Some(text) => Ok(CheckResult::new(CommitState::Success, "AI summary", text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppSource, Application};

    fn pr() -> crate::model::PullRequest {
        crate::model::PullRequest {
            base_ref: "main".into(),
            head_ref: "feature".into(),
            default_branch: "main".into(),
            clone_url: "https://github.com/acme/infra".into(),
            full_name: "acme/infra".into(),
            owner: "acme".into(),
            name: "infra".into(),
            check_id: 1,
            sha: "deadbeef".into(),
            labels: vec![],
            username: "bot".into(),
            email: "bot@example.com".into(),
            config: Default::default(),
        }
    }

    fn app() -> Application {
        Application::single_source(
            "a",
            AppSource {
                repo_url: "https://github.com/acme/infra".into(),
                path: "apps/a".into(),
                helm: None,
                kustomize: None,
                target_revision: String::new(),
            },
        )
    }

    struct StubSummarizer;

    #[async_trait]
    impl Summarizer for StubSummarizer {
        async fn summarize(&self, _old: &[String], _new: &[String]) -> Result<Option<String>, ProcessorError> {
            Ok(Some("replica count increased".into()))
        }
    }

    #[tokio::test]
    async fn default_summarizer_skips() {
        let processor = SummaryProcessor::default();
        let pr = pr();
        let app = app();
        let yaml: Vec<String> = vec![];
        let ctx = CheckRequestCtx {
            pull_request: &pr,
            application: &app,
            yaml_manifests: &yaml,
            json_manifests: &[],
            base_yaml_manifests: &yaml,
        };
        let result = processor.process(&ctx).await.unwrap();
        assert_eq!(result.state, CommitState::Skip);
    }

    #[tokio::test]
    async fn configured_summarizer_yields_success() {
        let processor = SummaryProcessor::new(StubSummarizer);
        let pr = pr();
        let app = app();
        let yaml: Vec<String> = vec![];
        let ctx = CheckRequestCtx {
            pull_request: &pr,
            application: &app,
            yaml_manifests: &yaml,
            json_manifests: &[],
            base_yaml_manifests: &yaml,
        };
        let result = processor.process(&ctx).await.unwrap();
        assert_eq!(result.state, CommitState::Success);
        assert_eq!(result.details, "replica count increased");
    }
}
