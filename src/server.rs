//! HTTP wiring: the axum app that exposes the webhook endpoint, a health
//! check, and a queue-stats endpoint. The concrete VCS adapter (GitHub/
//! GitLab/Gitea) is chosen by the binary that constructs [`crate::request_entry::RequestEntry`];
//! this module only knows the [`crate::vcs::VcsClient`] trait.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::body::Bytes;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::{info, warn};

use crate::queue::RepoQueueManager;
use crate::request_entry::RequestEntry;

#[derive(Clone)]
struct ServerState {
    request_entry: Arc<RequestEntry>,
    queue: Arc<RepoQueueManager>,
}

/// Builds the axum [`Router`] for the gate's HTTP surface.
///
/// Routes:
/// - `POST /webhook/{event_type}` — webhook delivery, dispatched to
///   [`RequestEntry::handle_webhook`].
/// - `GET /healthz` — liveness probe.
/// - `GET /readyz` — readiness probe; ready as soon as the dependency
///   container (VCS client, repo index, queue manager) exists, since
///   [`build_router`] can't be called without one.
/// - `GET /stats` — [`RepoQueueManager::stats`] snapshot, for operators
///   debugging a stuck repo queue.
#[must_use]
pub fn build_router(request_entry: Arc<RequestEntry>, queue: Arc<RepoQueueManager>) -> Router {
    let state = ServerState { request_entry, queue };
    Router::new()
        .route("/webhook/{event_type}", post(handle_webhook))
        .route("/healthz", get(health_check))
        .route("/readyz", get(ready_check))
        .route("/stats", get(queue_stats))
        .with_state(state)
}

async fn handle_webhook(
    State(state): State<ServerState>,
    axum::extract::Path(event_type): axum::extract::Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    match state.request_entry.handle_webhook(&event_type, &headers, &body).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            warn!(event_type, %err, "webhook handling failed");
            err.into_response()
        }
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn ready_check(State(_state): State<ServerState>) -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn queue_stats(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = state.queue.stats().await;
    let per_queue: Vec<_> = stats
        .per_queue
        .iter()
        .map(|q| {
            json!({
                "repoKey": q.repo_key,
                "queued": q.queued,
                "capacity": q.capacity,
                "processed": q.processed,
            })
        })
        .collect();
    Json(json!({
        "totalQueues": stats.total_queues,
        "perQueue": per_queue,
    }))
}

/// Binds and serves `router` on `addr` until the process is terminated.
/// Thin wrapper kept in the core so binaries don't have to re-derive the
/// usual `axum::serve` boilerplate.
pub async fn serve(router: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gate listening");
    axum::serve(listener, router).await?;
    Ok(())
}
