//! VCS transport: the excluded external collaborator. Only the
//! trait shape, the canonical commit-status mapping, and webhook-secret
//! verification (pure functions, no network I/O) belong to the core; the
//! concrete GitHub/GitLab/Gitea HTTP calls are adapters implementing
//! [`VcsClient`].

mod hook;
pub mod secret;

pub use hook::{HookEvent, ParsedHook};

use async_trait::async_trait;
use thiserror::Error;

use crate::comment::Message;
use crate::model::{CommitState, PullRequest};

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("webhook event type is not handled")]
    InvalidType,
    #[error("failed to parse webhook payload: {0}")]
    MalformedPayload(String),
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

pub type VcsResult<T> = std::result::Result<T, VcsError>;

/// A registered repo webhook: platform id plus the target URL the platform
/// delivers events to.
#[derive(Debug, Clone)]
pub struct RepoHook {
    pub id: String,
    pub url: String,
}

/// Abstract VCS client. A concrete implementation exists per platform
/// (GitHub/GitLab/Gitea); the core depends only on this trait so
/// [`crate::pipeline::CheckPipeline`] and [`crate::request_entry`] stay
/// platform-agnostic.
#[async_trait]
pub trait VcsClient: Send + Sync {
    /// Verify the webhook signature/secret and return the raw body on
    /// success.
    fn verify_hook(&self, headers: &axum::http::HeaderMap, body: &[u8], secret: &str) -> VcsResult<Vec<u8>>;

    /// Parse a verified webhook body into a typed event. Returns
    /// `VcsError::InvalidType` for event kinds outside the required set
    /// so the caller can ignore them with a 200.
    async fn parse_hook(&self, event_type: &str, body: &[u8]) -> VcsResult<ParsedHook>;

    async fn post_message(&self, pr: &PullRequest, chunks: &[String]) -> VcsResult<Message>;
    async fn update_message(&self, pr: &PullRequest, message: &Message, chunks: &[String]) -> VcsResult<()>;
    async fn commit_status(&self, pr: &PullRequest, state: CommitState) -> VcsResult<()>;
    async fn get_pull_request_files(&self, pr: &PullRequest) -> VcsResult<Vec<String>>;
    async fn download_archive(&self, pr: &PullRequest) -> VcsResult<String>;
    async fn tidy_outdated_comments(&self, pr: &PullRequest) -> VcsResult<()>;

    /// Look up an existing repo webhook pointing at `hook_url`, if the
    /// platform already has one registered.
    async fn get_hook_by_url(&self, repo_url: &str, hook_url: &str) -> VcsResult<Option<RepoHook>>;
    /// Register a new repo webhook pointed at `hook_url`, signed with
    /// `secret`.
    async fn create_hook(&self, repo_url: &str, hook_url: &str, secret: &str) -> VcsResult<RepoHook>;
    /// Load a previously registered hook by its platform id.
    async fn load_hook(&self, repo_url: &str, id: &str) -> VcsResult<RepoHook>;

    fn get_auth_headers(&self) -> Vec<(String, String)>;
    fn to_emoji(&self, state: CommitState) -> &'static str;
    fn get_max_comment_length(&self) -> usize;
    fn get_pr_comment_link_template(&self, pr: &PullRequest) -> String;
}

/// Canonical → platform commit-status mapping. Each platform adapter
/// calls this to translate [`CommitState`] into the string its API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    GitHub,
    GitLab,
    Gitea,
}

#[must_use]
pub fn platform_status(platform: Platform, state: CommitState) -> &'static str {
    use CommitState::{Error, Failure, None as StNone, Panic, Running, Skip, Success, Warning};
    match (platform, state) {
        (Platform::GitLab, Running) => "running",
        (_, Running) => "pending",
        (_, Success | Warning | StNone | Skip) => "success",
        (Platform::GitLab, Failure) => "failed",
        (_, Failure) => "failure",
        (Platform::GitLab, Error | Panic) => "failed",
        (_, Error | Panic) => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_status_mapping_matches_table() {
        assert_eq!(platform_status(Platform::GitHub, CommitState::Running), "pending");
        assert_eq!(platform_status(Platform::GitLab, CommitState::Running), "running");
        assert_eq!(platform_status(Platform::Gitea, CommitState::Running), "pending");

        for p in [Platform::GitHub, Platform::GitLab, Platform::Gitea] {
            assert_eq!(platform_status(p, CommitState::Success), "success");
            assert_eq!(platform_status(p, CommitState::Warning), "success");
            assert_eq!(platform_status(p, CommitState::None), "success");
            assert_eq!(platform_status(p, CommitState::Skip), "success");
        }

        assert_eq!(platform_status(Platform::GitHub, CommitState::Failure), "failure");
        assert_eq!(platform_status(Platform::GitLab, CommitState::Failure), "failed");
        assert_eq!(platform_status(Platform::Gitea, CommitState::Failure), "failure");

        assert_eq!(platform_status(Platform::GitHub, CommitState::Error), "error");
        assert_eq!(platform_status(Platform::GitLab, CommitState::Error), "failed");
        assert_eq!(platform_status(Platform::Gitea, CommitState::Panic), "error");
    }
}

/// A minimal in-memory `VcsClient` used by other modules' tests (the
/// pipeline's unit tests in particular) so they don't need a real network
/// adapter to exercise the control flow.
#[cfg(test)]
pub mod tests_support {
    use super::{ParsedHook, VcsClient, VcsResult};
    use crate::comment::Message;
    use crate::model::{CommitState, PullRequest};
    use async_trait::async_trait;

    pub struct NoopVcsClient;

    #[async_trait]
    impl VcsClient for NoopVcsClient {
        fn verify_hook(&self, _headers: &axum::http::HeaderMap, _body: &[u8], _secret: &str) -> VcsResult<Vec<u8>> {
            Ok(Vec::new())
        }

        async fn parse_hook(&self, _event_type: &str, _body: &[u8]) -> VcsResult<ParsedHook> {
            Err(super::VcsError::InvalidType)
        }

        async fn post_message(&self, pr: &PullRequest, _chunks: &[String]) -> VcsResult<Message> {
            Ok(Message::new(pr.full_name.clone(), pr.check_id))
        }

        async fn update_message(&self, _pr: &PullRequest, _message: &Message, _chunks: &[String]) -> VcsResult<()> {
            Ok(())
        }

        async fn commit_status(&self, _pr: &PullRequest, _state: CommitState) -> VcsResult<()> {
            Ok(())
        }

        async fn get_pull_request_files(&self, _pr: &PullRequest) -> VcsResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn download_archive(&self, _pr: &PullRequest) -> VcsResult<String> {
            Ok(String::new())
        }

        async fn tidy_outdated_comments(&self, _pr: &PullRequest) -> VcsResult<()> {
            Ok(())
        }

        async fn get_hook_by_url(&self, _repo_url: &str, _hook_url: &str) -> VcsResult<Option<super::RepoHook>> {
            Ok(None)
        }

        async fn create_hook(&self, _repo_url: &str, hook_url: &str, _secret: &str) -> VcsResult<super::RepoHook> {
            Ok(super::RepoHook {
                id: "noop".to_string(),
                url: hook_url.to_string(),
            })
        }

        async fn load_hook(&self, _repo_url: &str, id: &str) -> VcsResult<super::RepoHook> {
            Ok(super::RepoHook {
                id: id.to_string(),
                url: String::new(),
            })
        }

        fn get_auth_headers(&self) -> Vec<(String, String)> {
            Vec::new()
        }

        fn to_emoji(&self, _state: CommitState) -> &'static str {
            ""
        }

        fn get_max_comment_length(&self) -> usize {
            65536
        }

        fn get_pr_comment_link_template(&self, _pr: &PullRequest) -> String {
            "see previous comment".to_string()
        }
    }

    #[allow(unused_imports)]
    use HookEvent as _HookEventUnusedSilence;
}
