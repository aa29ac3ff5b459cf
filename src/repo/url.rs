//! Canonicalized git repository URLs.
//!
//! Both `https://host/owner/repo.git` and `git@host:owner/repo.git` (the
//! scp-style shorthand `ssh` understands natively) must canonicalize to the
//! same `{host, path}` pair so the index treats them as the same repo.

use std::fmt;

/// Canonical `{host, path}` identity of a git repository.
///
/// `path` never has a leading `/` or a trailing `.git`. Two `RepoUrl`s
/// compare equal iff their canonical forms match, regardless of which
/// surface syntax (https vs scp-style, with/without a `.git` suffix, with/
/// without an embedded username) produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoUrl {
    pub host: String,
    pub path: String,
}

impl RepoUrl {
    /// Parse either an `http(s)://` URL or an scp-style `user@host:path`
    /// git remote into its canonical form.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(parsed) = Self::parse_http(raw) {
            return Some(parsed);
        }
        Self::parse_scp(raw)
    }

    fn parse_http(raw: &str) -> Option<Self> {
        let url = url::Url::parse(raw).ok()?;
        if !matches!(url.scheme(), "http" | "https" | "git" | "ssh") {
            return None;
        }
        let host = url.host_str()?.to_string();
        let path = Self::normalize_path(url.path());
        Some(Self { host, path })
    }

    /// `[user@]host:path` — the shorthand git accepts directly as a remote.
    fn parse_scp(raw: &str) -> Option<Self> {
        let colon = raw.find(':')?;
        let (host_part, path_part) = raw.split_at(colon);
        let path_part = &path_part[1..];
        if host_part.is_empty() || path_part.is_empty() || path_part.starts_with('/') && path_part.len() > 1 && host_part.contains('/') {
            // Looks like a local absolute path (e.g. "C:\...") rather than scp syntax.
            return None;
        }
        let host = match host_part.rsplit_once('@') {
            Some((_, host)) => host,
            None => host_part,
        };
        if host.is_empty() || host.contains('/') {
            return None;
        }
        Some(Self {
            host: host.to_string(),
            path: Self::normalize_path(path_part),
        })
    }

    fn normalize_path(path: &str) -> String {
        path.trim_start_matches('/')
            .trim_end_matches(".git")
            .trim_end_matches('/')
            .to_string()
    }

    /// `https://[user@]host/path` — used to reconstruct clone URLs for
    /// `RepoIndex::get_vcs_repos`.
    #[must_use]
    pub fn clone_url(&self, username: Option<&str>) -> String {
        match username {
            Some(user) if !user.is_empty() => {
                format!("https://{user}@{}/{}", self.host, self.path)
            }
            _ => format!("https://{}/{}", self.host, self.path),
        }
    }

    /// `host/path` — the queue identity used by [`crate::queue::RepoQueueManager`].
    #[must_use]
    pub fn repo_key(&self) -> String {
        format!("{}/{}", self.host, self.path)
    }
}

impl fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host, self.path)
    }
}
