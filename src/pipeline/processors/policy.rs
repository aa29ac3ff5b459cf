//! Policy evaluation: runs rendered manifests through an OPA/Conftest
//! or Kyverno style policy engine. Those engines are external-process
//! collaborators excluded from this crate, so only the
//! [`PolicyEngine`] seam and a thin [`PolicyCheckProcessor`] adapter live
//! here; production wiring plugs in a real engine out-of-crate.

use async_trait::async_trait;

use crate::model::{CheckResult, CommitState};

use super::super::{CheckProcessor, CheckRequestCtx, ProcessorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PolicySeverity {
    Warning,
    Violation,
}

#[derive(Debug, Clone)]
pub struct PolicyFinding {
    pub resource: String,
    pub rule: String,
    pub message: String,
    pub severity: PolicySeverity,
}

/// Evaluates a set of rendered JSON manifests against whatever policy rules
/// the deployment registers. Implemented out-of-crate by a Conftest/Kyverno
/// adapter; the only in-crate implementation is a test double.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    async fn evaluate(&self, manifests: &[serde_json::Value]) -> Result<Vec<PolicyFinding>, ProcessorError>;
}

/// Always reports no findings. Stands in for the real adapter so the
/// pipeline can be wired and exercised without a policy engine installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPolicyEngine;

#[async_trait]
impl PolicyEngine for NullPolicyEngine {
    async fn evaluate(&self, _manifests: &[serde_json::Value]) -> Result<Vec<PolicyFinding>, ProcessorError> {
        Ok(Vec::new())
    }
}

/// The registered "policy" check: `Failure` if any finding is a
/// hard violation, `Warning` if only warnings were raised, else `Success`.
pub struct PolicyCheckProcessor {
    engine: Box<dyn PolicyEngine>,
}

impl PolicyCheckProcessor {
    #[must_use]
    pub fn new(engine: impl PolicyEngine + 'static) -> Self {
        Self { engine: Box::new(engine) }
    }
}

impl Default for PolicyCheckProcessor {
    fn default() -> Self {
        Self::new(NullPolicyEngine)
    }
}

#[async_trait]
impl CheckProcessor for PolicyCheckProcessor {
    fn name(&self) -> &str {
        "policy"
    }

    async fn process(&self, ctx: &CheckRequestCtx<'_>) -> Result<CheckResult, ProcessorError> {
        if ctx.json_manifests.is_empty() {
            return Ok(CheckResult::skip("no manifests to evaluate"));
        }
        let findings = self.engine.evaluate(ctx.json_manifests).await?;
        if findings.is_empty() {
            return Ok(CheckResult::new(CommitState::Success, "policy checks passed", String::new()));
        }
        let state = if findings.iter().any(|f| f.severity == PolicySeverity::Violation) {
            CommitState::Failure
        } else {
            CommitState::Warning
        };
        let details = findings
            .iter()
            .map(|f| format!("- [{:?}] {} ({}): {}", f.severity, f.rule, f.resource, f.message))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(CheckResult::new(state, format!("{} finding(s)", findings.len()), details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppSource, Application};

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

    fn app() -> Application {
        Application::single_source(
            "a",
            AppSource {
                repo_url: "https://github.com/acme/infra".into(),
                path: "apps/a".into(),
                helm: None,
                kustomize: None,
                target_revision: String::new(),
            },
        )
    }

    struct WarningEngine;

    #[async_trait]
    impl PolicyEngine for WarningEngine {
        async fn evaluate(&self, _manifests: &[serde_json::Value]) -> Result<Vec<PolicyFinding>, ProcessorError> {
            Ok(vec![PolicyFinding {
                resource: "Deployment/a".into(),
                rule: "require-resource-limits".into(),
                message: "missing cpu limit".into(),
                severity: PolicySeverity::Warning,
            }])
        }
    }

    struct ViolationEngine;

    #[async_trait]
    impl PolicyEngine for ViolationEngine {
        async fn evaluate(&self, _manifests: &[serde_json::Value]) -> Result<Vec<PolicyFinding>, ProcessorError> {
            Ok(vec![PolicyFinding {
                resource: "Deployment/a".into(),
                rule: "deny-privileged".into(),
                message: "privileged container".into(),
                severity: PolicySeverity::Violation,
            }])
        }
    }

    fn ctx<'a>(pr: &'a crate::model::PullRequest, app: &'a Application, yaml: &'a [String], manifests: &'a [serde_json::Value]) -> CheckRequestCtx<'a> {
        CheckRequestCtx {
            pull_request: pr,
            application: app,
            yaml_manifests: yaml,
            json_manifests: manifests,
            base_yaml_manifests: yaml,
        }
    }

    #[tokio::test]
    async fn empty_manifest_set_is_skip() {
        let processor = PolicyCheckProcessor::default();
        let pr = pr();
        let app = app();
        let yaml: Vec<String> = vec![];
        let result = processor.process(&ctx(&pr, &app, &yaml, &[])).await.unwrap();
        assert_eq!(result.state, CommitState::Skip);
    }

    #[tokio::test]
    async fn warning_only_findings_yield_warning_state() {
        let processor = PolicyCheckProcessor::new(WarningEngine);
        let pr = pr();
        let app = app();
        let yaml: Vec<String> = vec![];
        let manifests = vec![serde_json::json!({"kind": "Deployment"})];
        let result = processor.process(&ctx(&pr, &app, &yaml, &manifests)).await.unwrap();
        assert_eq!(result.state, CommitState::Warning);
    }

    #[tokio::test]
    async fn violation_findings_yield_failure_state() {
        let processor = PolicyCheckProcessor::new(ViolationEngine);
        let pr = pr();
        let app = app();
        let yaml: Vec<String> = vec![];
        let manifests = vec![serde_json::json!({"kind": "Deployment"})];
        let result = processor.process(&ctx(&pr, &app, &yaml, &manifests)).await.unwrap();
        assert_eq!(result.state, CommitState::Failure);
    }
}
