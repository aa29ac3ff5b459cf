//! `GateConfig`: the single configuration record for the service, loaded
//! from a mounted file with a handful of environment overrides layered on
//! top for values operators commonly inject as Kubernetes secrets.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Supported VCS backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsType {
    GitHub,
    GitLab,
    Gitea,
}

/// What to do with a prior review comment once a fresh one is posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TidyOutdatedCommentsMode {
    Hide,
    Delete,
}

/// Whether PR heads are obtained via a git clone/fetch or a platform archive
/// download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveMode {
    Off,
    On,
}

/// Top-level configuration record. Loaded once at startup and shared
/// read-only via `Arc` through the dependency container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(rename = "vcsType")]
    pub vcs_type: VcsType,
    #[serde(rename = "vcsToken")]
    pub vcs_token: String,
    #[serde(rename = "vcsBaseUrl", default)]
    pub vcs_base_url: Option<String>,
    #[serde(rename = "vcsUsername", default)]
    pub vcs_username: String,
    #[serde(rename = "webhookSecret", default)]
    pub webhook_secret: String,

    #[serde(rename = "queueSize", default = "default_queue_size")]
    pub queue_size: usize,
    #[serde(rename = "workerParallelism", default = "default_worker_parallelism")]
    pub worker_parallelism: usize,

    #[serde(rename = "maxCommentLength", default = "default_max_comment_length")]
    pub max_comment_length: usize,
    #[serde(rename = "showDebugInfo", default)]
    pub show_debug_info: bool,
    #[serde(rename = "labelFilter", default)]
    pub label_filter: Vec<String>,

    #[serde(rename = "tidyOutdatedCommentsMode", default = "default_tidy_mode")]
    pub tidy_outdated_comments_mode: TidyOutdatedCommentsMode,
    #[serde(rename = "replanCommentMessage", default = "default_replan_message")]
    pub replan_comment_message: String,
    #[serde(default = "default_identifier")]
    pub identifier: String,

    #[serde(rename = "archiveMode", default = "default_archive_mode")]
    pub archive_mode: ArchiveMode,
    #[serde(rename = "archiveCacheDir", default)]
    pub archive_cache_dir: Option<String>,
    #[serde(rename = "archiveCacheTtlSeconds", default = "default_archive_cache_ttl")]
    pub archive_cache_ttl_seconds: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_queue_size() -> usize {
    100
}
fn default_worker_parallelism() -> usize {
    4
}
fn default_max_comment_length() -> usize {
    65536
}
fn default_tidy_mode() -> TidyOutdatedCommentsMode {
    TidyOutdatedCommentsMode::Hide
}
fn default_replan_message() -> String {
    "/replan".to_string()
}
fn default_identifier() -> String {
    "kubegate".to_string()
}
fn default_archive_mode() -> ArchiveMode {
    ArchiveMode::Off
}
fn default_archive_cache_ttl() -> u64 {
    300
}

/// Logging/tracing initialization knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            filter: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl GateConfig {
    /// Load from a mounted YAML file, then apply a handful of environment
    /// overrides for values operators commonly inject via Kubernetes
    /// secrets rather than the ConfigMap.
    pub fn from_mounted_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("reading config file {:?}: {e}", path.as_ref()))?;
        let mut cfg: GateConfig = serde_yaml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing config file {:?}: {e}", path.as_ref()))?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("GATE_VCS_TOKEN") {
            if !token.is_empty() {
                self.vcs_token = token;
            }
        }
        if let Ok(secret) = std::env::var("GATE_WEBHOOK_SECRET") {
            if !secret.is_empty() {
                self.webhook_secret = secret;
            }
        }
        if let Ok(filter) = std::env::var("GATE_LOG_FILTER") {
            if !filter.is_empty() {
                self.logging.filter = Some(filter);
            }
        }
    }

    #[must_use]
    pub fn archive_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.archive_cache_ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_yaml_with_defaults() {
        let yaml = r#"
vcsType: github
vcsToken: "abc123"
"#;
        let cfg: GateConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.vcs_type, VcsType::GitHub);
        assert_eq!(cfg.queue_size, 100);
        assert_eq!(cfg.worker_parallelism, 4);
        assert_eq!(cfg.tidy_outdated_comments_mode, TidyOutdatedCommentsMode::Hide);
        assert_eq!(cfg.identifier, "kubegate");
    }

    #[test]
    fn env_override_replaces_token() {
        std::env::set_var("GATE_VCS_TOKEN", "from-env");
        let yaml = "vcsType: gitlab\nvcsToken: \"placeholder\"\n";
        let mut cfg: GateConfig = serde_yaml::from_str(yaml).unwrap();
        cfg.apply_env_overrides();
        assert_eq!(cfg.vcs_token, "from-env");
        std::env::remove_var("GATE_VCS_TOKEN");
    }
}
