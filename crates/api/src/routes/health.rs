use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Configured worker runtime executable.
    pub worker_runtime: String,
    /// Whether the worker runtime answered at startup.
    pub runtime_available: bool,
    /// Per-job worker budget in seconds.
    pub worker_timeout_secs: u64,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// GET / -- plain-text welcome banner.
async fn welcome() -> &'static str {
    "Welcome to the Movie Recommendation API!"
}

/// GET /health -- returns service and worker runtime health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.runtime_available {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        worker_runtime: state.bridge.config().runtime.clone(),
        runtime_available: state.runtime_available,
        worker_timeout_secs: state.config.worker.timeout_secs,
        request_timeout_secs: state.config.request_timeout_secs,
    })
}

/// Mount root-level routes (NOT under `/api`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
}
