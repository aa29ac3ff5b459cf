//! `RepoIndex`: `RepoUrl → AppDirectory` and `RepoUrl → AppSetDirectory`,
//! plus the ApplicationSet content-scan used to catch app-sets introduced by
//! the very PR under test (and therefore not yet in the index).

use dashmap::DashMap;
use serde::Deserialize;
use tracing::warn;

use crate::model::{AppSource, Application, ApplicationSet};

use super::directory::{AppDirectory, AppSetDirectory, Directory};
use super::kustomize::{self, RepoFs};
use super::url::RepoUrl;
use super::watcher::{AppEvent, AppEventKind};

/// One file touched by the PR, with its post-change content when available
/// (needed to content-scan for embedded `kind: ApplicationSet` manifests).
#[derive(Debug, Clone)]
pub struct ChangedFile {
    pub path: String,
    pub content: Option<String>,
}

impl ChangedFile {
    #[must_use]
    pub fn path_only(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
        }
    }
}

/// The process-wide map from repo identity to the applications that
/// reference it. Cheap to clone (wraps `Arc`-backed concurrent maps);
/// directories never back-reference the index.
#[derive(Clone)]
pub struct RepoIndex {
    apps: DashMap<RepoUrl, AppDirectory>,
    app_sets: DashMap<RepoUrl, AppSetDirectory>,
    vcs_username: String,
}

impl RepoIndex {
    #[must_use]
    pub fn new(vcs_username: impl Into<String>) -> Self {
        Self {
            apps: DashMap::new(),
            app_sets: DashMap::new(),
            vcs_username: vcs_username.into(),
        }
    }

    /// Apply one watcher event, serializing mutation of the affected
    /// directories.
    pub fn apply(&self, event: AppEvent) {
        match event {
            AppEvent::App { kind, old, new } => match kind {
                AppEventKind::Add => {
                    if let Some(app) = new {
                        self.add_app(app);
                    }
                }
                AppEventKind::Update => {
                    if let Some(old) = old {
                        self.delete_app(&old);
                    }
                    if let Some(new) = new {
                        self.add_app(new);
                    }
                }
                AppEventKind::Delete => {
                    if let Some(app) = old {
                        self.delete_app(&app);
                    }
                }
            },
            AppEvent::AppSet { kind, old, new } => match kind {
                AppEventKind::Add => {
                    if let Some(app_set) = new {
                        self.add_app_set(app_set);
                    }
                }
                AppEventKind::Update => {
                    if let Some(old) = old {
                        self.delete_app_set(&old);
                    }
                    if let Some(new) = new {
                        self.add_app_set(new);
                    }
                }
                AppEventKind::Delete => {
                    if let Some(app_set) = old {
                        self.delete_app_set(&app_set);
                    }
                }
            },
        }
    }

    fn first_source(sources: &[AppSource]) -> Option<&AppSource> {
        sources.first()
    }

    pub fn add_app(&self, app: Application) {
        let Some(source) = Self::first_source(&app.sources) else {
            warn!(app = %app.name, "application has no source, skipping");
            return;
        };
        let Some(url) = RepoUrl::parse(&source.repo_url) else {
            warn!(app = %app.name, repo_url = %source.repo_url, "could not parse application repo URL, skipping");
            return;
        };
        self.apps.entry(url).or_insert_with(Directory::new).process(app);
    }

    pub fn update_app(&self, old: Application, new: Application) {
        self.delete_app(&old);
        self.add_app(new);
    }

    pub fn delete_app(&self, app: &Application) {
        if let Some(source) = Self::first_source(&app.sources) {
            if let Some(url) = RepoUrl::parse(&source.repo_url) {
                if let Some(mut dir) = self.apps.get_mut(&url) {
                    dir.remove(app);
                }
            }
        }
    }

    pub fn add_app_set(&self, app_set: ApplicationSet) {
        let Some(source) = Self::first_source(&app_set.sources) else {
            warn!(app_set = %app_set.name, "application set has no source, skipping");
            return;
        };
        let Some(url) = RepoUrl::parse(&source.repo_url) else {
            warn!(app_set = %app_set.name, repo_url = %source.repo_url, "could not parse application-set repo URL, skipping");
            return;
        };
        self.app_sets
            .entry(url)
            .or_insert_with(Directory::new)
            .process(app_set);
    }

    pub fn update_app_set(&self, old: ApplicationSet, new: ApplicationSet) {
        self.delete_app_set(&old);
        self.add_app_set(new);
    }

    pub fn delete_app_set(&self, app_set: &ApplicationSet) {
        if let Some(source) = Self::first_source(&app_set.sources) {
            if let Some(url) = RepoUrl::parse(&source.repo_url) {
                if let Some(mut dir) = self.app_sets.get_mut(&url) {
                    dir.remove(app_set);
                }
            }
        }
    }

    /// Normalize `url` and return its (possibly freshly-created, empty)
    /// `AppDirectory`.
    #[must_use]
    pub fn get_apps_in_repo(&self, url: &str) -> AppDirectory {
        match RepoUrl::parse(url) {
            Some(u) => self.apps.entry(u).or_insert_with(Directory::new).clone(),
            None => Directory::new(),
        }
    }

    #[must_use]
    pub fn get_app_sets_in_repo(&self, url: &str) -> AppSetDirectory {
        match RepoUrl::parse(url) {
            Some(u) => self.app_sets.entry(u).or_insert_with(Directory::new).clone(),
            None => Directory::new(),
        }
    }

    /// `CloneURL(username)` for every indexed repo (apps and app-sets),
    /// deduplicated.
    #[must_use]
    pub fn get_vcs_repos(&self) -> Vec<String> {
        let mut urls: Vec<RepoUrl> = self.apps.iter().map(|e| e.key().clone()).collect();
        for e in self.app_sets.iter() {
            if !urls.contains(e.key()) {
                urls.push(e.key().clone());
            }
        }
        urls.into_iter()
            .map(|u| u.clone_url(Some(&self.vcs_username)))
            .collect()
    }

    /// Applications/app-sets affected by a kustomize-based source tree,
    /// walking `kustomization.yaml` references from each indexed app's
    /// source root. Returns a fresh directory; it is not merged into the
    /// index.
    #[must_use]
    pub fn walk_kustomize_apps(&self, clone_url: &str, fs: &dyn RepoFs) -> AppDirectory {
        let Some(url) = RepoUrl::parse(clone_url) else {
            warn!(%clone_url, "could not canonicalize clone URL for kustomize walk");
            return Directory::new();
        };
        let apps: Vec<Application> = self
            .apps
            .get(&url)
            .map(|dir| dir.apps.values().cloned().collect())
            .unwrap_or_default();
        kustomize::walk_kustomize_apps(&apps, fs)
    }

    /// ApplicationSets affected by `changed`: the indexed directory match
    /// plus any ApplicationSet manifests introduced or modified by the PR
    /// itself (content-scanned, since a brand-new app-set isn't indexed
    /// yet).
    #[must_use]
    pub fn find_app_sets_based_on_change_list(
        &self,
        repo_url: &str,
        changed: &[ChangedFile],
        target_branch: &str,
    ) -> Vec<ApplicationSet> {
        let dir = self.get_app_sets_in_repo(repo_url);
        let paths: Vec<String> = changed.iter().map(|c| c.path.clone()).collect();
        let mut found = dir.find_based_on_change_list(&paths, target_branch);

        let mut seen: Vec<std::sync::Arc<str>> = found.iter().map(|a| a.name.clone()).collect();
        for file in changed {
            let Some(content) = &file.content else {
                continue;
            };
            if !mentions_application_set(content) {
                continue;
            }
            if let Some(app_set) = parse_embedded_app_set(content) {
                if app_set
                    .sources
                    .iter()
                    .any(|s| super::should_include(&s.target_revision, target_branch))
                    && !seen.contains(&app_set.name)
                {
                    seen.push(app_set.name.clone());
                    found.push(app_set);
                }
            }
        }
        found
    }
}

/// Plain line scan for a literal `kind: ApplicationSet` line — deliberately
/// not a full YAML parse, so a manifest that merely *references* the word
/// `ApplicationSet` in a comment or string value doesn't spuriously surface
/// (a real `kind:` key is always its own line at the document's top level).
fn mentions_application_set(content: &str) -> bool {
    content
        .lines()
        .any(|line| line.trim() == "kind: ApplicationSet")
}

#[derive(Debug, Deserialize)]
struct RawAppSetManifest {
    metadata: RawMetadata,
    spec: RawAppSetSpec,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawAppSetSpec {
    #[serde(default)]
    template: Option<RawTemplate>,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    spec: RawTemplateSpec,
}

#[derive(Debug, Default, Deserialize)]
struct RawTemplateSpec {
    #[serde(default)]
    source: Option<RawSource>,
    #[serde(default)]
    sources: Vec<RawSource>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(rename = "repoURL")]
    repo_url: String,
    path: String,
    #[serde(default, rename = "targetRevision")]
    target_revision: String,
}

impl From<RawSource> for AppSource {
    fn from(raw: RawSource) -> Self {
        AppSource {
            repo_url: raw.repo_url,
            path: raw.path,
            helm: None,
            kustomize: None,
            target_revision: raw.target_revision,
        }
    }
}

fn parse_embedded_app_set(content: &str) -> Option<ApplicationSet> {
    let raw: RawAppSetManifest = match serde_yaml::from_str(content) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "failed to parse embedded ApplicationSet manifest");
            return None;
        }
    };
    let template_spec = raw.spec.template?.spec;
    let mut sources: Vec<AppSource> = template_spec.sources.into_iter().map(Into::into).collect();
    if let Some(source) = template_spec.source {
        sources.push(source.into());
    }
    if sources.is_empty() {
        return None;
    }
    Some(ApplicationSet {
        name: raw.metadata.name.into(),
        sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HelmSource;

    fn app(name: &str, repo: &str, path: &str) -> Application {
        Application::single_source(
            name,
            AppSource {
                repo_url: repo.into(),
                path: path.into(),
                helm: Some(HelmSource {
                    value_files: vec!["values.yaml".into()],
                    file_parameters: vec![],
                }),
                kustomize: None,
                target_revision: String::new(),
            },
        )
    }

    #[test]
    fn equivalent_urls_map_to_same_directory() {
        let index = RepoIndex::new("bot");
        index.add_app(app("a", "https://github.com/acme/infra.git", "apps/a"));

        let via_https = index.get_apps_in_repo("https://github.com/acme/infra");
        let via_scp = index.get_apps_in_repo("git@github.com:acme/infra.git");
        assert!(via_https.apps.contains_key("a"));
        assert!(via_scp.apps.contains_key("a"));
        assert_eq!(via_https.dirs, via_scp.dirs);
    }

    #[test]
    fn add_then_delete_leaves_index_observationally_empty() {
        let index = RepoIndex::new("bot");
        let a = app("a", "https://github.com/acme/infra", "apps/a");
        index.add_app(a.clone());
        index.delete_app(&a);
        let dir = index.get_apps_in_repo("https://github.com/acme/infra");
        assert!(dir.is_empty());
    }

    #[test]
    fn update_across_repos_moves_the_app() {
        let index = RepoIndex::new("bot");
        let old = app("a", "https://github.com/acme/infra", "apps/a");
        let new = app("a", "https://github.com/acme/other", "apps/a");
        index.add_app(old.clone());
        index.update_app(old, new);

        assert!(index.get_apps_in_repo("https://github.com/acme/infra").is_empty());
        assert!(index
            .get_apps_in_repo("https://github.com/acme/other")
            .apps
            .contains_key("a"));
    }

    #[test]
    fn get_vcs_repos_reconstructs_clone_urls() {
        let index = RepoIndex::new("bot");
        index.add_app(app("a", "git@github.com:acme/infra.git", "apps/a"));
        let repos = index.get_vcs_repos();
        assert_eq!(repos, vec!["https://bot@github.com/acme/infra".to_string()]);
    }

    #[test]
    fn embedded_app_set_manifest_is_scanned_from_diff_content() {
        let index = RepoIndex::new("bot");
        let manifest = r#"
apiVersion: argoproj.io/v1alpha1
kind: ApplicationSet
metadata:
  name: fleet
spec:
  template:
    spec:
      source:
        repoURL: https://github.com/acme/infra
        path: apps/fleet
        targetRevision: ""
"#;
        let changed = vec![ChangedFile {
            path: "appsets/fleet.yaml".into(),
            content: Some(manifest.to_string()),
        }];
        let found =
            index.find_app_sets_based_on_change_list("https://github.com/acme/infra", &changed, "main");
        assert_eq!(found.len(), 1);
        assert_eq!(&*found[0].name, "fleet");
    }

    #[test]
    fn non_applicationset_manifest_is_not_surfaced() {
        assert!(!mentions_application_set("kind: Application\n"));
        assert!(!mentions_application_set("# mentions ApplicationSet in a comment\n"));
    }
}
