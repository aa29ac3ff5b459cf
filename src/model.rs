//! Core data types shared by every component: repo sources, the commit-state
//! lattice, per-application results and the pull/merge request descriptor.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Outcome of a single check run against a single application.
///
/// Totally ordered; `max` over a set of states is the "worst state" used to
/// drive the commit status (see [`CommitState`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CommitState {
    None,
    Skip,
    Success,
    Running,
    Warning,
    Failure,
    Error,
    Panic,
}

impl CommitState {
    /// Worst (numerically greatest) state across a set, `None` if empty.
    #[must_use]
    pub fn worst(states: impl IntoIterator<Item = CommitState>) -> CommitState {
        states.into_iter().max().unwrap_or(CommitState::None)
    }

    /// Name without decoration, used when composing a result's nested
    /// `<details>` summary line (`"<summary> <state.Bare> <emoji>"`).
    #[must_use]
    pub fn bare(self) -> &'static str {
        match self {
            CommitState::None => "None",
            CommitState::Skip => "Skip",
            CommitState::Success => "Success",
            CommitState::Running => "Running",
            CommitState::Warning => "Warning",
            CommitState::Failure => "Failure",
            CommitState::Error => "Error",
            CommitState::Panic => "Panic",
        }
    }

    /// `true` for states that should not be rendered in the final comment:
    /// "no changes detected" or intentional no-ops don't get a nested
    /// `<details>` block.
    #[must_use]
    pub fn is_none(self) -> bool {
        matches!(self, CommitState::None)
    }
}

/// Result of running one [`crate::pipeline::CheckProcessor`] against one
/// application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub state: CommitState,
    pub summary: String,
    pub details: String,
    #[serde(default)]
    pub no_changes_detected: bool,
}

impl CheckResult {
    #[must_use]
    pub fn new(state: CommitState, summary: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            state,
            summary: summary.into(),
            details: details.into(),
            no_changes_detected: false,
        }
    }

    #[must_use]
    pub fn skip(summary: impl Into<String>) -> Self {
        Self::new(CommitState::Skip, summary, String::new())
    }

    #[must_use]
    pub fn no_changes() -> Self {
        Self {
            state: CommitState::Skip,
            summary: String::new(),
            details: String::new(),
            no_changes_detected: true,
        }
    }

    #[must_use]
    pub fn error(summary: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(CommitState::Error, summary, details)
    }

    /// Whether this result is kept in the rendered comment: results that
    /// are `NoChangesDetected` or `Skip` are dropped.
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        !self.no_changes_detected && self.state != CommitState::Skip
    }
}

/// Ordered sequence of results for one application, in the order the check
/// pipeline produced them.
pub type AppResults = Vec<CheckResult>;

/// Helm-specific parts of an [`AppSource`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HelmSource {
    #[serde(default)]
    pub value_files: Vec<String>,
    #[serde(default)]
    pub file_parameters: Vec<HelmFileParameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelmFileParameter {
    pub path: String,
}

/// Kustomize-specific marker: presence alone (no extra fields needed today)
/// tells [`crate::repo::kustomize`] to walk the source tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KustomizeSource;

/// One source entry of an Application/ApplicationSet. Most apps have a
/// single source; multi-source apps carry several.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSource {
    pub repo_url: String,
    pub path: String,
    #[serde(default)]
    pub helm: Option<HelmSource>,
    #[serde(default)]
    pub kustomize: Option<KustomizeSource>,
    #[serde(default)]
    pub target_revision: String,
}

/// An Argo-CD `Application`. Identified by name; may carry one or more
/// sources (multi-source apps).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub name: Arc<str>,
    pub sources: Vec<AppSource>,
    #[serde(default)]
    pub destination_namespace: String,
    #[serde(default)]
    pub project: String,
}

impl Application {
    #[must_use]
    pub fn single_source(name: impl Into<Arc<str>>, source: AppSource) -> Self {
        Self {
            name: name.into(),
            sources: vec![source],
            destination_namespace: String::new(),
            project: String::new(),
        }
    }
}

/// An Argo-CD `ApplicationSet`. Structurally the same identity shape as
/// [`Application`]; kept as a distinct type so the two directories in
/// [`crate::repo::RepoIndex`] can't be confused at the type level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSet {
    pub name: Arc<str>,
    pub sources: Vec<AppSource>,
}

/// Immutable descriptor of the pull/merge request under test, constructed by
/// the VCS client when it parses the webhook.
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub base_ref: String,
    pub head_ref: String,
    pub default_branch: String,
    pub clone_url: String,
    pub full_name: String,
    pub owner: String,
    pub name: String,
    pub check_id: i64,
    pub sha: String,
    pub labels: Vec<String>,
    pub username: String,
    pub email: String,
    /// Freeform, platform-specific config blob (VCS type, base URL, ...).
    pub config: HashMap<String, String>,
}

impl PullRequest {
    /// Stable identity used to deduplicate shutdown-drop notifications.
    #[must_use]
    pub fn dedup_key(&self) -> (String, i64) {
        (self.full_name.clone(), self.check_id)
    }
}
