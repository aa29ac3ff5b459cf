//! `AppDirectory` / `AppSetDirectory`: per-repo maps from directories and
//! files to the applications whose manifests they affect.
//!
//! Both directories are structurally identical, so they're expressed as
//! one generic `Directory<T>` keyed on anything with a `name()` and a list of
//! [`AppSource`]s. `Directory<Application>` is `AppDirectory`;
//! `Directory<ApplicationSet>` is `AppSetDirectory`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{AppSource, Application, ApplicationSet};

/// Anything that can be indexed by [`Directory`]: has a stable name and a
/// list of sources to walk.
pub trait Indexable {
    fn name(&self) -> Arc<str>;
    fn sources(&self) -> &[AppSource];
}

impl Indexable for Application {
    fn name(&self) -> Arc<str> {
        self.name.clone()
    }
    fn sources(&self) -> &[AppSource] {
        &self.sources
    }
}

impl Indexable for ApplicationSet {
    fn name(&self) -> Arc<str> {
        self.name.clone()
    }
    fn sources(&self) -> &[AppSource] {
        &self.sources
    }
}

/// Per-repo map from directories/files to the app (or app-set) names whose
/// rendering depends on them.
#[derive(Debug, Clone, Default)]
pub struct Directory<T> {
    pub apps: HashMap<Arc<str>, T>,
    pub dirs: HashMap<String, Vec<Arc<str>>>,
    pub files: HashMap<String, Vec<Arc<str>>>,
}

pub type AppDirectory = Directory<Application>;
pub type AppSetDirectory = Directory<ApplicationSet>;

impl<T: Indexable + Clone> Directory<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            apps: HashMap::new(),
            dirs: HashMap::new(),
            files: HashMap::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty() && self.dirs.is_empty() && self.files.is_empty()
    }

    /// Record `item` and, for each of its sources, register the source root
    /// directory plus any explicit helm value-file/file-parameter
    /// dependencies resolved relative to that root.
    pub fn process(&mut self, item: T) {
        let name = item.name();
        for source in item.sources() {
            self.add_dir(name.clone(), &source.path);
            if let Some(helm) = &source.helm {
                for value_file in &helm.value_files {
                    self.add_file(name.clone(), &join_relative(&source.path, value_file));
                }
                for param in &helm.file_parameters {
                    self.add_file(name.clone(), &join_relative(&source.path, &param.path));
                }
            }
        }
        self.apps.insert(name, item);
    }

    /// Remove `item` from every map it appears in.
    pub fn remove(&mut self, item: &T) {
        let name = item.name();
        self.apps.remove(&name);
        for names in self.dirs.values_mut() {
            names.retain(|n| n != &name);
        }
        for names in self.files.values_mut() {
            names.retain(|n| n != &name);
        }
        self.dirs.retain(|_, v| !v.is_empty());
        self.files.retain(|_, v| !v.is_empty());
    }

    pub fn add_dir(&mut self, name: Arc<str>, dir: &str) {
        let dir = normalize_dir(dir);
        let entry = self.dirs.entry(dir).or_default();
        if !entry.contains(&name) {
            entry.push(name);
        }
    }

    pub fn add_file(&mut self, name: Arc<str>, path: &str) {
        let entry = self.files.entry(path.to_string()).or_default();
        if !entry.contains(&name) {
            entry.push(name);
        }
    }

    /// Union two directories: `apps` keeps the first value on key collision;
    /// `dirs`/`files` concatenate (dedup-preserving).
    #[must_use]
    pub fn union(mut self, other: Self) -> Self {
        for (name, item) in other.apps {
            self.apps.entry(name).or_insert(item);
        }
        for (dir, names) in other.dirs {
            let entry = self.dirs.entry(dir).or_default();
            for n in names {
                if !entry.contains(&n) {
                    entry.push(n);
                }
            }
        }
        for (file, names) in other.files {
            let entry = self.files.entry(file).or_default();
            for n in names {
                if !entry.contains(&n) {
                    entry.push(n);
                }
            }
        }
        self
    }

    /// Every app/app-set whose directory is a prefix of `changed_path` or
    /// whose `files` map has `changed_path` as an exact key.
    fn names_touched_by(&self, changed_path: &str) -> Vec<Arc<str>> {
        let mut hit = Vec::new();
        for (dir, names) in &self.dirs {
            if is_prefix(dir, changed_path) {
                for n in names {
                    if !hit.contains(n) {
                        hit.push(n.clone());
                    }
                }
            }
        }
        if let Some(names) = self.files.get(changed_path) {
            for n in names {
                if !hit.contains(n) {
                    hit.push(n.clone());
                }
            }
        }
        hit
    }

    /// Applications/app-sets affected by `changed`, filtered by
    /// [`crate::repo::should_include`] against `target_branch`.
    #[must_use]
    pub fn find_based_on_change_list(&self, changed: &[String], target_branch: &str) -> Vec<T> {
        let mut seen: Vec<Arc<str>> = Vec::new();
        for path in changed {
            for name in self.names_touched_by(path) {
                if !seen.contains(&name) {
                    seen.push(name);
                }
            }
        }
        seen.into_iter()
            .filter_map(|name| self.apps.get(&name).cloned())
            .filter(|item| {
                item.sources()
                    .iter()
                    .any(|s| super::should_include(&s.target_revision, target_branch))
            })
            .collect()
    }
}

/// `dir` is a directory prefix of `path`: either an exact match, or `path`
/// starts with `dir` followed by `/`.
fn is_prefix(dir: &str, path: &str) -> bool {
    if dir.is_empty() {
        return true;
    }
    path == dir || path.starts_with(&format!("{dir}/"))
}

fn normalize_dir(dir: &str) -> String {
    dir.trim_end_matches('/').to_string()
}

/// Join a helm value-file/file-parameter path relative to the application's
/// source root, resolving leading `./` and `..` segments.
pub fn join_relative(root: &str, rel: &str) -> String {
    let mut parts: Vec<&str> = root.split('/').filter(|s| !s.is_empty()).collect();
    for seg in rel.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
