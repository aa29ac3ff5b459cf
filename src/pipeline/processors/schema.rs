//! Schema validation: checks rendered manifests against Kubernetes'
//! OpenAPI schemas. The real validator (kubeconform) is an external process
//! this crate deliberately stays out of reach, so
//! only the narrow [`SchemaValidator`] seam and a [`SchemaCheckProcessor`]
//! adapter ship here.

use async_trait::async_trait;

use crate::model::{CheckResult, CommitState};

use super::super::{CheckProcessor, CheckRequestCtx, ProcessorError};

/// One schema violation found in a manifest.
#[derive(Debug, Clone)]
pub struct SchemaViolation {
    pub resource: String,
    pub message: String,
}

/// Validates a set of rendered JSON manifests against Kubernetes schemas.
/// Implemented out-of-crate by a kubeconform (or similar) adapter; the only
/// in-crate implementation is a test double.
#[async_trait]
pub trait SchemaValidator: Send + Sync {
    async fn validate(&self, manifests: &[serde_json::Value]) -> Result<Vec<SchemaViolation>, ProcessorError>;
}

/// Always reports a clean validation. Stands in for the real adapter so the
/// pipeline can be wired and exercised without a kubeconform binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSchemaValidator;

#[async_trait]
impl SchemaValidator for NullSchemaValidator {
    async fn validate(&self, _manifests: &[serde_json::Value]) -> Result<Vec<SchemaViolation>, ProcessorError> {
        Ok(Vec::new())
    }
}

/// The registered "schema" check: reports [`SchemaValidator`]
/// findings as a single result, `Failure` if anything was violated.
pub struct SchemaCheckProcessor {
    validator: Box<dyn SchemaValidator>,
}

impl SchemaCheckProcessor {
    #[must_use]
    pub fn new(validator: impl SchemaValidator + 'static) -> Self {
        Self {
            validator: Box::new(validator),
        }
    }
}

impl Default for SchemaCheckProcessor {
    fn default() -> Self {
        Self::new(NullSchemaValidator)
    }
}

#[async_trait]
impl CheckProcessor for SchemaCheckProcessor {
    fn name(&self) -> &str {
        "schema"
    }

    async fn process(&self, ctx: &CheckRequestCtx<'_>) -> Result<CheckResult, ProcessorError> {
        if ctx.json_manifests.is_empty() {
            return Ok(CheckResult::skip("no manifests to validate"));
        }
        let violations = self.validator.validate(ctx.json_manifests).await?;
        if violations.is_empty() {
            return Ok(CheckResult::new(CommitState::Success, "schema valid", String::new()));
        }
        let details = violations
            .iter()
            .map(|v| format!("- {}: {}", v.resource, v.message))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(CheckResult::new(
            CommitState::Failure,
            format!("{} schema violation(s)", violations.len()),
            details,
        ))
    }
}
