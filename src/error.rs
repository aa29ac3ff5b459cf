//! Crate-wide error taxonomy.
//!
//! Most check-level failures never reach here — the pipeline folds them into
//! a `Result { state: CommitState::Error, .. }` (see [`crate::model`]) so the
//! PR always gets a comment. `GateError` is reserved for failures at the
//! edges: parsing a webhook, canonicalizing a repo URL, handing work to the
//! queue.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors surfaced at the HTTP/queue boundary.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("webhook signature verification failed")]
    InvalidSignature,

    #[error("unsupported or ignorable webhook event")]
    UnsupportedEvent,

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error("repo queue is full for {repo_key}")]
    QueueFull { repo_key: String },

    #[error("could not canonicalize repo URL {0:?}")]
    InvalidRepoUrl(String),

    #[error("upstream VCS error: {0}")]
    Vcs(#[from] anyhow::Error),
}

pub type GateResult<T> = std::result::Result<T, GateError>;

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = match &self {
            GateError::InvalidSignature => StatusCode::UNAUTHORIZED,
            GateError::UnsupportedEvent => StatusCode::OK,
            GateError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            GateError::QueueFull { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GateError::InvalidRepoUrl(_) => StatusCode::BAD_REQUEST,
            GateError::Vcs(_) => StatusCode::BAD_GATEWAY,
        };
        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
