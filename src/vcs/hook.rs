//! Parsed webhook shapes: a tagged sum type standing in for the source's
//! "type switch" over platform payloads.

use crate::model::PullRequest;

/// The required hook event set: PR created/updated/reopened/edited, or
/// a comment whose normalized body equals the configured replan trigger.
/// Every other event is rejected by the adapter as `VcsError::InvalidType`
/// before it ever reaches this enum.
#[derive(Debug, Clone)]
pub enum HookEvent {
    PullRequestCreated,
    PullRequestUpdated,
    PullRequestReopened,
    PullRequestEdited,
    ReplanComment,
}

/// A webhook body, already verified and classified.
#[derive(Debug, Clone)]
pub struct ParsedHook {
    pub event: HookEvent,
    pub pull_request: PullRequest,
}

/// Normalize a comment body for replan-trigger comparison: trim whitespace,
/// case-insensitive.
#[must_use]
pub fn is_replan_comment(body: &str, trigger: &str) -> bool {
    body.trim().eq_ignore_ascii_case(trigger.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replan_trigger_matches_case_and_whitespace_insensitively() {
        assert!(is_replan_comment("  /replan  ", "/replan"));
        assert!(is_replan_comment("/REPLAN", "/replan"));
        assert!(!is_replan_comment("please replan", "/replan"));
    }
}
