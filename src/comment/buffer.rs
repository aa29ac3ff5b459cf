//! `CommentBuffer` (the `Message` type): concurrent-safe accumulator of
//! per-application [`CheckResult`] records, rendered into one or more
//! platform-sized comment bodies by [`Message::build_comment`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::model::{AppResults, CheckResult, CommitState};

use super::chunker::{split_content_preserving_code_blocks, Chunker};

/// Inner state guarded by `Message`'s single mutex: it is the single point
/// of contention within a PR's check run.
#[derive(Debug, Default)]
struct Inner {
    apps: BTreeMap<String, AppResults>,
    deleted: std::collections::HashSet<String>,
}

/// One PR's accumulating review: created on the first "running…" comment,
/// updated as checks complete, finalized on the last update.
pub struct Message {
    pub full_name: String,
    pub check_id: i64,
    pub note_id: Mutex<Option<String>>,
    inner: Mutex<Inner>,
}

impl Message {
    #[must_use]
    pub fn new(full_name: impl Into<String>, check_id: i64) -> Self {
        Self {
            full_name: full_name.into(),
            check_id,
            note_id: Mutex::new(None),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn set_note_id(&self, id: impl Into<String>) {
        *self.note_id.lock().unwrap() = Some(id.into());
    }

    #[must_use]
    pub fn get_note_id(&self) -> Option<String> {
        self.note_id.lock().unwrap().clone()
    }

    /// Register an app with no results yet (so it shows up once its first
    /// result arrives even under concurrent completion).
    pub fn add_new_app(&self, name: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner.apps.entry(name.into()).or_default();
    }

    pub fn add_to_app_message(&self, name: impl Into<String>, result: CheckResult) {
        let mut inner = self.inner.lock().unwrap();
        inner.apps.entry(name.into()).or_default().push(result);
    }

    /// Suppress `name` from rendered output (AffectedResolver retracted it
    /// mid-run).
    pub fn remove_app(&self, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.deleted.insert(name.to_string());
    }

    /// Worst state across all non-deleted apps' kept results.
    #[must_use]
    pub fn worst_state(&self) -> CommitState {
        let inner = self.inner.lock().unwrap();
        CommitState::worst(
            inner
                .apps
                .iter()
                .filter(|(name, _)| !inner.deleted.contains(*name))
                .flat_map(|(_, results)| results.iter())
                .filter(|r| r.is_rendered())
                .map(|r| r.state),
        )
    }

    #[must_use]
    pub fn app_count(&self) -> usize {
        self.inner.lock().unwrap().apps.len()
    }

    #[must_use]
    pub fn total_result_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .apps
            .values()
            .map(|r| r.len())
            .sum()
    }

    /// Render this message into one or more platform-sized chunks.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn build_comment(&self, params: &BuildCommentParams<'_>) -> Vec<String> {
        let inner = self.inner.lock().unwrap();

        let header = get_message_header(params.identifier);
        let continuation_header_len = continuation_header(params.pr_link_template).chars().count();
        let mut chunker = Chunker::new(params.max_comment_length).with_continuation_header_len(continuation_header_len);
        chunker.push_raw(&header);

        let mut any_emitted = false;
        for (name, results) in inner.apps.iter() {
            if inner.deleted.contains(name) {
                continue;
            }
            let kept: Vec<&CheckResult> = results.iter().filter(|r| r.is_rendered()).collect();
            if kept.is_empty() {
                continue;
            }
            any_emitted = true;
            render_app(&mut chunker, name, &kept);
        }

        if !any_emitted {
            return vec!["No changes".to_string()];
        }

        let footer = render_footer(params);
        chunker.try_push(&footer);

        let full = chunker.finish();
        // If the fully-assembled document (minus internal split warnings)
        // would have fit in one chunk, prefer the single-chunk rendering so
        // ordinary-sized reports never carry a spurious warning line.
        if full.len() > 1 {
            let combined: String = full
                .iter()
                .map(|c| c.replace(super::chunker::SPLIT_WARNING, ""))
                .collect::<Vec<_>>()
                .join("");
            if combined.chars().count() <= params.max_comment_length {
                return vec![combined];
            }
        }
        full
    }
}

/// Parameters threaded through `BuildComment`.
pub struct BuildCommentParams<'a> {
    pub sha: &'a str,
    pub label_filter: &'a [String],
    pub show_debug: bool,
    pub identifier: &'a str,
    pub apps_checked: usize,
    pub total_checked: usize,
    pub max_comment_length: usize,
    pub pr_link_template: &'a str,
    pub pod_hostname: Option<&'a str>,
    pub wall_duration: Option<std::time::Duration>,
}

fn get_message_header(identifier: &str) -> String {
    format!("# {identifier} review\n\n")
}

/// The header the VCS adapter prepends to every chunk but the first when it
/// posts or edits the comment, referencing the previous comment via
/// `pr_link_template`. Rendered here only to size the chunker's
/// continuation budget; the chunker never writes this text into chunk
/// content itself, since the adapter owns the actual post/edit.
fn continuation_header(pr_link_template: &str) -> String {
    format!("_(continued from {pr_link_template})_\n\n")
}

fn emoji_for(state: CommitState) -> &'static str {
    match state {
        CommitState::None | CommitState::Skip => "",
        CommitState::Success => "✅",
        CommitState::Running => "⏳",
        CommitState::Warning => "⚠️",
        CommitState::Failure => "❌",
        CommitState::Error => "💥",
        CommitState::Panic => "💀",
    }
}

fn render_app(chunker: &mut Chunker, name: &str, results: &[&CheckResult]) {
    let app_state = CommitState::worst(results.iter().map(|r| r.state));
    let emoji = emoji_for(app_state);
    let header = if app_state.is_none() {
        format!("<details>\n<summary>## ArgoCD Application Checks: {name}</summary>\n\n")
    } else {
        format!("<details>\n<summary>## ArgoCD Application Checks: {name} {emoji}</summary>\n\n")
    };
    chunker.try_push(&header);

    for result in results {
        let summary_line = result_summary_line(result);
        chunker.try_push(&format!("<details>\n<summary>{summary_line}</summary>\n\n"));

        let remaining = chunker.remaining().saturating_sub("\n</details>\n\n".chars().count());
        if chunker.would_overflow(&result.details) && remaining > 0 {
            for piece in split_content_preserving_code_blocks(&result.details, remaining) {
                chunker.try_push(&piece);
            }
        } else {
            chunker.try_push(&result.details);
        }
        chunker.try_push("\n</details>\n\n");
    }

    // Close the outer block only if it fits; omitting is acceptable because
    // the next chunk reopens in context.
    if !chunker.would_overflow("</details>\n\n") {
        chunker.push_raw("</details>\n\n");
    }
}

fn result_summary_line(result: &CheckResult) -> String {
    let emoji = emoji_for(result.state);
    match (result.state.is_none(), result.summary.is_empty(), result.details.is_empty()) {
        (true, true, true) => "Success".to_string(),
        (true, _, _) => result.summary.clone(),
        (false, true, true) => format!("Success {emoji}"),
        (false, _, _) => format!("{} {} {}", result.summary, result.state.bare(), emoji),
    }
}

fn render_footer(params: &BuildCommentParams<'_>) -> String {
    let mut footer = format!("\n---\nSHA: `{}`", params.sha);
    if params.show_debug {
        footer.push_str(&format!(
            " | host: {} | duration: {:?} | labels: {:?} | apps checked: {} | total checks: {}",
            params.pod_hostname.unwrap_or("unknown"),
            params.wall_duration.unwrap_or_default(),
            params.label_filter,
            params.apps_checked,
            params.total_checked,
        ));
    }
    footer.push('\n');
    footer
}
