//! Hook/sync-wave classifier: groups rendered `Unstructured` objects
//! by their effective Argo-CD sync phase and wave, normalizing the Helm hook
//! vocabulary into Argo-CD's. Pure data transform over already-rendered
//! JSON, so (like the diff processor) it is implemented for real rather
//! than left behind an external-collaborator trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::model::{CheckResult, CommitState};

use super::super::{CheckProcessor, CheckRequestCtx, ProcessorError};

pub const ARGOCD_HOOK_ANNOTATION: &str = "argocd.argoproj.io/hook";
pub const ARGOCD_SYNC_WAVE_ANNOTATION: &str = "argocd.argoproj.io/sync-wave";
pub const HELM_HOOK_ANNOTATION: &str = "helm.sh/hook";
pub const HELM_HOOK_WEIGHT_ANNOTATION: &str = "helm.sh/hook-weight";

/// Argo-CD sync phases, declared in a fixed output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPhase {
    PreSync,
    Sync,
    PostSync,
    SyncFail,
    PostDelete,
}

/// Fixed phase output order: `[PreSync, Sync, PostSync, SyncFail, PostDelete]`.
const PHASE_ORDER: [SyncPhase; 5] = [
    SyncPhase::PreSync,
    SyncPhase::Sync,
    SyncPhase::PostSync,
    SyncPhase::SyncFail,
    SyncPhase::PostDelete,
];

impl SyncPhase {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SyncPhase::PreSync => "PreSync",
            SyncPhase::Sync => "Sync",
            SyncPhase::PostSync => "PostSync",
            SyncPhase::SyncFail => "SyncFail",
            SyncPhase::PostDelete => "PostDelete",
        }
    }

    fn parse_argocd(raw: &str) -> Option<Self> {
        match raw {
            "PreSync" => Some(SyncPhase::PreSync),
            "Sync" => Some(SyncPhase::Sync),
            "PostSync" => Some(SyncPhase::PostSync),
            "SyncFail" => Some(SyncPhase::SyncFail),
            "PostDelete" => Some(SyncPhase::PostDelete),
            _ => None,
        }
    }

    /// Normalize a Helm hook name into its Argo-CD equivalent:
    /// `pre-install`/`pre-upgrade`/`crd-install` → `PreSync`;
    /// `post-install`/`post-upgrade` → `PostSync`; `post-delete` →
    /// `PostDelete`.
    fn from_helm(raw: &str) -> Option<Self> {
        match raw {
            "pre-install" | "pre-upgrade" | "crd-install" => Some(SyncPhase::PreSync),
            "post-install" | "post-upgrade" => Some(SyncPhase::PostSync),
            "post-delete" => Some(SyncPhase::PostDelete),
            _ => None,
        }
    }
}

/// One classified resource: its display name and resolved wave.
#[derive(Debug, Clone)]
struct ClassifiedResource {
    name: String,
    wave: i32,
}

fn annotation<'a>(manifest: &'a Value, key: &str) -> Option<&'a str> {
    manifest.get("metadata")?.get("annotations")?.get(key)?.as_str()
}

fn resource_name(manifest: &Value) -> String {
    manifest
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>")
        .to_string()
}

/// Resolve the effective phase for one manifest: the `argocd.argoproj.io/hook`
/// annotation wins if present and recognized, else the Helm hook annotation
/// normalized via the mapping table. Returns `None` for manifests carrying
/// neither annotation (not hook-managed, excluded from grouping).
fn resolve_phase(manifest: &Value) -> Option<SyncPhase> {
    if let Some(raw) = annotation(manifest, ARGOCD_HOOK_ANNOTATION) {
        if let Some(phase) = SyncPhase::parse_argocd(raw) {
            return Some(phase);
        }
    }
    if let Some(raw) = annotation(manifest, HELM_HOOK_ANNOTATION) {
        if let Some(phase) = SyncPhase::from_helm(raw) {
            return Some(phase);
        }
    }
    None
}

/// Resolve the sync-wave weight: `argocd.argoproj.io/sync-wave` wins over
/// `helm.sh/hook-weight` (first annotation present wins); absent entirely
/// defaults to 0 (Argo-CD's own default). A present-but-unparseable value
/// is a hard error, signed 32-bit.
fn resolve_wave(manifest: &Value) -> Result<i32, String> {
    let raw = annotation(manifest, ARGOCD_SYNC_WAVE_ANNOTATION).or_else(|| annotation(manifest, HELM_HOOK_WEIGHT_ANNOTATION));
    match raw {
        None => Ok(0),
        Some(raw) => raw
            .trim()
            .parse::<i32>()
            .map_err(|_| format!("invalid sync-wave/hook-weight value {raw:?} on {}", resource_name(manifest))),
    }
}

/// `phase → wave → [resource name]`, built from every manifest carrying a
/// recognized hook annotation.
type Grouped = BTreeMap<SyncPhase, BTreeMap<i32, Vec<String>>>;

fn classify(manifests: &[Value]) -> Result<Grouped, String> {
    let mut grouped: BTreeMap<SyncPhase, BTreeMap<i32, Vec<ClassifiedResource>>> = BTreeMap::new();
    for manifest in manifests {
        let Some(phase) = resolve_phase(manifest) else {
            continue;
        };
        let wave = resolve_wave(manifest)?;
        grouped
            .entry(phase)
            .or_default()
            .entry(wave)
            .or_default()
            .push(ClassifiedResource {
                name: resource_name(manifest),
                wave,
            });
    }

    let mut out: Grouped = BTreeMap::new();
    for phase in PHASE_ORDER {
        if let Some(waves) = grouped.remove(&phase) {
            let mut by_wave: BTreeMap<i32, Vec<String>> = BTreeMap::new();
            for (wave, resources) in waves {
                by_wave.insert(wave, resources.into_iter().map(|r| r.name).collect());
            }
            out.insert(phase, by_wave);
        }
    }
    Ok(out)
}

fn render(grouped: &Grouped) -> (String, String) {
    let phases: Vec<&str> = PHASE_ORDER
        .iter()
        .filter(|p| grouped.contains_key(*p))
        .map(|p| p.label())
        .collect();
    let summary = format!("Sync Phases: {}", phases.join(", "));

    let mut details = String::new();
    for phase in PHASE_ORDER {
        let Some(waves) = grouped.get(&phase) else {
            continue;
        };
        details.push_str(&format!("### {}\n", phase.label()));
        for (wave, names) in waves {
            details.push_str(&format!("- wave {wave}: {}\n", names.join(", ")));
        }
    }
    (summary, details)
}

/// The registered "hooks" check: classifies hook-annotated resources
/// by phase and sync-wave. Skips (no-op) when nothing in the rendered tree
/// carries a recognized hook annotation.
#[derive(Debug, Default, Clone, Copy)]
pub struct HookWaveProcessor;

#[async_trait]
impl CheckProcessor for HookWaveProcessor {
    fn name(&self) -> &str {
        "hooks"
    }

    async fn process(&self, ctx: &CheckRequestCtx<'_>) -> Result<CheckResult, ProcessorError> {
        let grouped = match classify(ctx.json_manifests) {
            Ok(g) => g,
            Err(msg) => return Ok(CheckResult::error("sync-wave parse failure", msg)),
        };
        if grouped.is_empty() {
            return Ok(CheckResult::skip("no hook-annotated resources"));
        }
        let (summary, details) = render(&grouped);
        Ok(CheckResult::new(CommitState::Success, summary, details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pr() -> crate::model::PullRequest {
        crate::model::PullRequest {
            base_ref: "main".into(),
            head_ref: "feature".into(),
            default_branch: "main".into(),
            clone_url: "https://github.com/acme/infra".into(),
            full_name: "acme/infra".into(),
            owner: "acme".into(),
            name: "infra".into(),
            check_id: 1,
            sha: "deadbeef".into(),
            labels: vec![],
            username: "bot".into(),
            email: "bot@example.com".into(),
            config: Default::default(),
        }
    }

    fn app() -> crate::model::Application {
        crate::model::Application::single_source(
            "a",
            crate::model::AppSource {
                repo_url: "https://github.com/acme/infra".into(),
                path: "apps/a".into(),
                helm: None,
                kustomize: None,
                target_revision: String::new(),
            },
        )
    }

    #[tokio::test]
    async fn groups_by_phase_and_wave_with_helm_normalization() {
        let manifests = vec![
            json!({
                "kind": "ConfigMap",
                "metadata": { "name": "a", "annotations": { ARGOCD_HOOK_ANNOTATION: "PreSync" } }
            }),
            json!({
                "kind": "ConfigMap",
                "metadata": { "name": "b", "annotations": { ARGOCD_HOOK_ANNOTATION: "PreSync", ARGOCD_SYNC_WAVE_ANNOTATION: "5" } }
            }),
            json!({
                "kind": "ConfigMap",
                "metadata": { "name": "c", "annotations": { HELM_HOOK_ANNOTATION: "post-install", HELM_HOOK_WEIGHT_ANNOTATION: "5" } }
            }),
        ];
        let processor = HookWaveProcessor;
        let pr = pr();
        let app = app();
        let yaml: Vec<String> = vec![];
        let ctx = CheckRequestCtx {
            pull_request: &pr,
            application: &app,
            yaml_manifests: &yaml,
            json_manifests: &manifests,
            base_yaml_manifests: &yaml,
        };
        let result = processor.process(&ctx).await.unwrap();
        assert_eq!(result.state, CommitState::Success);
        assert_eq!(result.summary, "Sync Phases: PreSync, PostSync");
        assert!(result.details.contains("wave 0: a"));
        assert!(result.details.contains("wave 5: b"));
        assert!(result.details.contains("### PostSync"));
        assert!(result.details.contains("wave 5: c"));
    }

    #[tokio::test]
    async fn no_hook_annotations_is_skip() {
        let manifests = vec![json!({"kind": "ConfigMap", "metadata": {"name": "plain"}})];
        let processor = HookWaveProcessor;
        let pr = pr();
        let app = app();
        let yaml: Vec<String> = vec![];
        let ctx = CheckRequestCtx {
            pull_request: &pr,
            application: &app,
            yaml_manifests: &yaml,
            json_manifests: &manifests,
            base_yaml_manifests: &yaml,
        };
        let result = processor.process(&ctx).await.unwrap();
        assert_eq!(result.state, CommitState::Skip);
    }

    #[tokio::test]
    async fn unparseable_wave_is_error() {
        let manifests = vec![json!({
            "kind": "ConfigMap",
            "metadata": { "name": "bad", "annotations": { ARGOCD_HOOK_ANNOTATION: "PreSync", ARGOCD_SYNC_WAVE_ANNOTATION: "not-a-number" } }
        })];
        let processor = HookWaveProcessor;
        let pr = pr();
        let app = app();
        let yaml: Vec<String> = vec![];
        let ctx = CheckRequestCtx {
            pull_request: &pr,
            application: &app,
            yaml_manifests: &yaml,
            json_manifests: &manifests,
            base_yaml_manifests: &yaml,
        };
        let result = processor.process(&ctx).await.unwrap();
        assert_eq!(result.state, CommitState::Error);
    }

    #[test]
    fn wave_boundary_values_parse() {
        let max = json!({"metadata": {"annotations": {ARGOCD_SYNC_WAVE_ANNOTATION: i32::MAX.to_string()}}});
        let min = json!({"metadata": {"annotations": {ARGOCD_SYNC_WAVE_ANNOTATION: i32::MIN.to_string()}}});
        assert_eq!(resolve_wave(&max).unwrap(), i32::MAX);
        assert_eq!(resolve_wave(&min).unwrap(), i32::MIN);
    }

    #[test]
    fn phase_order_is_fixed() {
        assert_eq!(
            PHASE_ORDER.map(SyncPhase::label),
            ["PreSync", "Sync", "PostSync", "SyncFail", "PostDelete"]
        );
    }
}
