//! `RepoIndex`: the in-memory map from VCS repository identity to the Argo
//! Applications/ApplicationSets that reference it, fed by an external
//! watcher and read by [`crate::resolver::AffectedResolver`].

pub mod directory;
pub mod index;
pub mod kustomize;
pub mod url;
pub mod watcher;

pub use directory::{AppDirectory, AppSetDirectory, Directory};
pub use index::{ChangedFile, RepoIndex};
pub use url::RepoUrl;
pub use watcher::{AppEvent, AppEventKind};

/// Whether an app/app-set whose source pins `target_revision` should be
/// considered affected by a PR targeting `target_branch`.
///
/// Two semantics for this existed upstream; this implementation pins the
/// newer one: an empty `targetRevision` always
/// matches (the app tracks whatever is checked out), an exact match always
/// matches, and `"HEAD"` matches only when the target branch is the repo's
/// conventional default (`main`/`master`) — `HEAD` against a `release`
/// branch does not match, since that app isn't tracking that branch.
#[must_use]
pub fn should_include(target_revision: &str, target_branch: &str) -> bool {
    if target_revision.is_empty() {
        return true;
    }
    if target_revision == target_branch {
        return true;
    }
    if target_revision == "HEAD" && matches!(target_branch, "main" | "master") {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_include_boundary_cases() {
        assert!(should_include("", "main"));
        assert!(should_include("main", "main"));
        assert!(should_include("HEAD", "main"));
        assert!(should_include("HEAD", "master"));
        assert!(!should_include("HEAD", "release"));
        assert!(!should_include("v1.0", "main"));
    }
}
