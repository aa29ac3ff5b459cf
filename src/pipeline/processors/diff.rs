//! Unified-diff generator: compares the rendered "current" tree
//! against the "proposed" one. Pure data transform, no external process, so
//! it is implemented for real behind a narrow [`DiffTool`] trait rather than
//! left as an interface-only stub.

use async_trait::async_trait;
use similar::{ChangeTag, TextDiff};

use crate::model::{CheckResult, CommitState};

use super::super::{CheckProcessor, CheckRequestCtx, ProcessorError};

/// Produces a unified diff between two manifest trees rendered as text.
/// A trait rather than a free function so tests can swap in a
/// deterministic stub and so an alternate diff engine can be dropped in
/// without touching [`DiffProcessor`].
pub trait DiffTool: Send + Sync {
    /// Returns `None` if `old` and `new` are identical.
    fn diff(&self, old: &str, new: &str) -> Option<String>;
}

/// Line-oriented unified diff rendered as a fenced ` ```diff ` block, built
/// on the `similar` crate (already in this codebase's dependency family via
/// the wider example pack's text-tooling crates).
#[derive(Debug, Default, Clone, Copy)]
pub struct UnifiedDiffTool;

impl DiffTool for UnifiedDiffTool {
    fn diff(&self, old: &str, new: &str) -> Option<String> {
        if old == new {
            return None;
        }
        let diff = TextDiff::from_lines(old, new);
        let mut body = String::from("```diff\n");
        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => '-',
                ChangeTag::Insert => '+',
                ChangeTag::Equal => ' ',
            };
            body.push(sign);
            body.push_str(change.value());
            if !change.value().ends_with('\n') {
                body.push('\n');
            }
        }
        body.push_str("```\n");
        Some(body)
    }
}

/// Joins a manifest list into one diffable text blob with a document
/// separator, mirroring how `kubectl`/`kustomize build` concatenate
/// multi-document YAML streams.
fn joined(manifests: &[String]) -> String {
    manifests.join("\n---\n")
}

/// The registered "diff" check: reports the textual difference
/// between the application's base-branch and proposed manifest trees.
pub struct DiffProcessor {
    tool: Box<dyn DiffTool>,
}

impl DiffProcessor {
    #[must_use]
    pub fn new(tool: impl DiffTool + 'static) -> Self {
        Self { tool: Box::new(tool) }
    }
}

impl Default for DiffProcessor {
    fn default() -> Self {
        Self::new(UnifiedDiffTool)
    }
}

#[async_trait]
impl CheckProcessor for DiffProcessor {
    fn name(&self) -> &str {
        "diff"
    }

    async fn process(&self, ctx: &CheckRequestCtx<'_>) -> Result<CheckResult, ProcessorError> {
        let old = joined(ctx.base_yaml_manifests);
        let new = joined(ctx.yaml_manifests);
        match self.tool.diff(&old, &new) {
            None => Ok(CheckResult::no_changes()),
            Some(body) => {
                let changed_lines = body.lines().filter(|l| l.starts_with('+') || l.starts_with('-')).count();
                Ok(CheckResult::new(
                    CommitState::Success,
                    format!("{changed_lines} line(s) changed"),
                    body,
                ))
            }
        }
    }
}
