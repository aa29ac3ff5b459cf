//! Built-in [`super::CheckProcessor`]s: representative implementations that
//! are useful but not mandatory. The diff generator and hook/sync-wave
//! classifier are pure data transforms and are implemented for real; schema
//! validation, policy evaluation and the optional AI summary wrap external
//! collaborators (Conftest/kube-conform/Kyverno, an LLM client) that stay
//! out of this crate — only the narrow trait and a test double ship here.

pub mod diff;
pub mod hooks;
pub mod policy;
pub mod schema;
pub mod summarizer;

pub use diff::{DiffProcessor, DiffTool, UnifiedDiffTool};
pub use hooks::{HookWaveProcessor, SyncPhase};
pub use policy::{PolicyCheckProcessor, PolicyEngine, PolicyFinding, PolicySeverity};
pub use schema::{SchemaCheckProcessor, SchemaValidator};
pub use summarizer::{SummaryProcessor, Summarizer};
