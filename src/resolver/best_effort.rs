//! Best-effort path-convention fallback: used only when the indexed
//! strategy finds nothing for a repo (i.e. the repo's Argo mapping is
//! unknown to the watcher). Rules are a pluggable, ordered list rather
//! than a fixed table; see `DESIGN.md` for the reasoning.

use crate::model::{AppSource, Application};
use crate::repo::index::ChangedFile;

/// One site-specific directory-layout convention. Given the full changed
/// file list and the repo's complete file tree, returns zero or more
/// synthesized `Application` stand-ins.
pub trait PathConventionRule: Send + Sync {
    fn resolve(&self, repo_name: &str, changed: &[ChangedFile], all_files: &[String]) -> Vec<Application>;
}

fn synthetic(name: String, path: String) -> Application {
    Application::single_source(
        name,
        AppSource {
            repo_url: String::new(),
            path,
            helm: None,
            kustomize: None,
            target_revision: String::new(),
        },
    )
}

/// `apps/<app>/<cluster>/…` → `name="<cluster>-<app>"`,
/// `path="apps/<app>/<cluster>/"`. When the change sits under a kustomize
/// base directory, also expands to sibling overlays discovered in the repo
/// file list.
pub struct AppsClusterRule;

const BASE_DIR_NAMES: &[&str] = &["base", "bases", "components", "resources"];

impl PathConventionRule for AppsClusterRule {
    fn resolve(&self, _repo_name: &str, changed: &[ChangedFile], all_files: &[String]) -> Vec<Application> {
        let mut out = Vec::new();
        for file in changed {
            let parts: Vec<&str> = file.path.split('/').collect();
            if parts.len() < 3 || parts[0] != "apps" {
                continue;
            }
            let app_name = parts[1];
            let cluster = parts[2];
            let name = format!("{cluster}-{app_name}");
            let path = format!("apps/{app_name}/{cluster}/");
            out.push(synthetic(name.clone(), path));

            if BASE_DIR_NAMES.contains(&cluster) {
                let prefix = format!("apps/{app_name}/overlays/");
                for candidate in all_files {
                    if let Some(rest) = candidate.strip_prefix(&prefix) {
                        if let Some(overlay) = rest.split('/').next() {
                            if !overlay.is_empty() {
                                out.push(synthetic(
                                    format!("{overlay}-{app_name}"),
                                    format!("apps/{app_name}/overlays/{overlay}/"),
                                ));
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

/// `manifests/<cluster>/…` or `charts/<cluster>/…` →
/// `name="<cluster>-<repoName>"`, `path="<root>/<cluster>/"`.
pub struct ManifestsOrChartsClusterRule;

impl PathConventionRule for ManifestsOrChartsClusterRule {
    fn resolve(&self, repo_name: &str, changed: &[ChangedFile], _all_files: &[String]) -> Vec<Application> {
        let mut out = Vec::new();
        for file in changed {
            let parts: Vec<&str> = file.path.split('/').collect();
            if parts.len() < 2 {
                continue;
            }
            let root = parts[0];
            if root != "manifests" && root != "charts" {
                continue;
            }
            let cluster = parts[1];
            out.push(synthetic(
                format!("{cluster}-{repo_name}"),
                format!("{root}/{cluster}/"),
            ));
        }
        out
    }
}

/// Drives an ordered set of [`PathConventionRule`]s and dedups the result by
/// app name (first occurrence wins).
pub struct BestEffortResolver {
    rules: Vec<Box<dyn PathConventionRule>>,
}

impl Default for BestEffortResolver {
    fn default() -> Self {
        Self {
            rules: vec![Box::new(AppsClusterRule), Box::new(ManifestsOrChartsClusterRule)],
        }
    }
}

impl BestEffortResolver {
    #[must_use]
    pub fn with_rules(rules: Vec<Box<dyn PathConventionRule>>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn resolve(&self, repo_name: &str, changed: &[ChangedFile], all_files: &[String]) -> Vec<Application> {
        let mut out: Vec<Application> = Vec::new();
        let mut seen: Vec<std::sync::Arc<str>> = Vec::new();
        for rule in &self.rules {
            for app in rule.resolve(repo_name, changed, all_files) {
                if !seen.contains(&app.name) {
                    seen.push(app.name.clone());
                    out.push(app);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apps_cluster_rule_names_by_cluster_then_app() {
        let rule = AppsClusterRule;
        let changed = vec![ChangedFile::path_only("apps/billing/prod/deployment.yaml")];
        let apps = rule.resolve("infra", &changed, &[]);
        assert_eq!(apps.len(), 1);
        assert_eq!(&*apps[0].name, "prod-billing");
        assert_eq!(apps[0].sources[0].path, "apps/billing/prod/");
    }

    #[test]
    fn base_change_expands_to_sibling_overlays() {
        let rule = AppsClusterRule;
        let changed = vec![ChangedFile::path_only("apps/billing/base/deployment.yaml")];
        let all_files = vec![
            "apps/billing/overlays/dev/kustomization.yaml".to_string(),
            "apps/billing/overlays/prod/kustomization.yaml".to_string(),
        ];
        let apps = rule.resolve("infra", &changed, &all_files);
        let names: Vec<String> = apps.iter().map(|a| a.name.to_string()).collect();
        assert!(names.contains(&"base-billing".to_string()));
        assert!(names.contains(&"dev-billing".to_string()));
        assert!(names.contains(&"prod-billing".to_string()));
    }

    #[test]
    fn manifests_and_charts_rule() {
        let rule = ManifestsOrChartsClusterRule;
        let changed = vec![
            ChangedFile::path_only("manifests/prod/ingress.yaml"),
            ChangedFile::path_only("charts/staging/Chart.yaml"),
        ];
        let apps = rule.resolve("infra", &changed, &[]);
        let names: Vec<String> = apps.iter().map(|a| a.name.to_string()).collect();
        assert_eq!(names, vec!["prod-infra", "staging-infra"]);
    }
}
