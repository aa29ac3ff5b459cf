//! `AffectedResolver`: given a repo, a changed-file list and a target
//! branch, produce the set of Applications/ApplicationSets whose rendered
//! manifests may have changed. Composes two strategies with `Union`: an
//! exact match against [`crate::repo::RepoIndex`] and a best-effort path
//! heuristic for repos the index doesn't know about.

mod best_effort;

pub use best_effort::{BestEffortResolver, PathConventionRule};

use crate::model::{Application, ApplicationSet};
use crate::repo::index::ChangedFile;
use crate::repo::{AppDirectory, AppSetDirectory, RepoIndex};

/// Union of the indexed and best-effort strategies, by app/app-set name
/// (first occurrence wins — the indexed result is always queried first).
#[derive(Debug, Clone, Default)]
pub struct Affected {
    pub apps: Vec<Application>,
    pub app_sets: Vec<ApplicationSet>,
}

impl Affected {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty() && self.app_sets.is_empty()
    }

    fn union(mut self, other: Affected) -> Self {
        let mut seen: Vec<std::sync::Arc<str>> = self.apps.iter().map(|a| a.name.clone()).collect();
        for app in other.apps {
            if !seen.contains(&app.name) {
                seen.push(app.name.clone());
                self.apps.push(app);
            }
        }
        let mut seen_sets: Vec<std::sync::Arc<str>> =
            self.app_sets.iter().map(|a| a.name.clone()).collect();
        for app_set in other.app_sets {
            if !seen_sets.contains(&app_set.name) {
                seen_sets.push(app_set.name.clone());
                self.app_sets.push(app_set);
            }
        }
        self
    }
}

/// Resolves the applications affected by a change, composing the indexed
/// lookup with a pluggable best-effort fallback.
pub struct AffectedResolver {
    best_effort: BestEffortResolver,
}

impl Default for AffectedResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AffectedResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            best_effort: BestEffortResolver::default(),
        }
    }

    #[must_use]
    pub fn with_rules(rules: Vec<Box<dyn PathConventionRule>>) -> Self {
        Self {
            best_effort: BestEffortResolver::with_rules(rules),
        }
    }

    /// `repo_url` is the canonical clone URL used to look up both
    /// directories in `index`. `changed` carries optional file content
    /// (used by the ApplicationSet content scan).
    #[must_use]
    pub fn resolve(
        &self,
        index: &RepoIndex,
        repo_url: &str,
        repo_name: &str,
        changed: &[ChangedFile],
        all_files: &[String],
        target_branch: &str,
    ) -> Affected {
        let indexed = self.indexed(index, repo_url, changed, target_branch);
        if !indexed.is_empty() {
            return indexed;
        }
        let fallback = Affected {
            apps: self
                .best_effort
                .resolve(repo_name, changed, all_files)
                .into_iter()
                .collect(),
            app_sets: Vec::new(),
        };
        indexed.union(fallback)
    }

    fn indexed(
        &self,
        index: &RepoIndex,
        repo_url: &str,
        changed: &[ChangedFile],
        target_branch: &str,
    ) -> Affected {
        let app_dir: AppDirectory = index.get_apps_in_repo(repo_url);
        let paths: Vec<String> = changed.iter().map(|c| c.path.clone()).collect();
        let apps = app_dir.find_based_on_change_list(&paths, target_branch);

        let app_sets =
            index.find_app_sets_based_on_change_list(repo_url, changed, target_branch);

        Affected { apps, app_sets }
    }
}
