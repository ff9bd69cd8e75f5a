//! Handlers for the movie recommendation endpoints.
//!
//! Each handler validates its query into a [`RecommendationRequest`] and
//! runs the matching worker through the script bridge. The worker's
//! document is the response body as-is. Validation failures return before
//! any process is started.

use axum::extract::{Path, Query, State};
use axum::Json;
use cinerec_core::recommendation::RecommendationRequest;
use serde_json::Value;

use crate::error::AppResult;
use crate::query::{CountParams, PreferenceParams, SearchParams};
use crate::state::AppState;

/// GET /api/movies/recommend/{id}
///
/// Movies similar to the given catalogue id.
pub async fn recommend_similar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<CountParams>,
) -> AppResult<Json<Value>> {
    let request = RecommendationRequest::similar(&id, params.num_rec.as_deref())?;
    run_recommendation(&state, request).await
}

/// GET /api/movies/search
///
/// Movies matching free-text keywords.
pub async fn search_by_keywords(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Value>> {
    let request =
        RecommendationRequest::keywords(params.keywords.as_deref(), params.num_rec.as_deref())?;
    run_recommendation(&state, request).await
}

/// GET /api/movies/preference-recommendations
///
/// Movies matching viewer preferences; at least one filter is required.
pub async fn recommend_by_preference(
    State(state): State<AppState>,
    Query(params): Query<PreferenceParams>,
) -> AppResult<Json<Value>> {
    let request = RecommendationRequest::preference(&params)?;
    run_recommendation(&state, request).await
}

async fn run_recommendation(
    state: &AppState,
    request: RecommendationRequest,
) -> AppResult<Json<Value>> {
    let descriptor = request.into_descriptor()?;
    let script = descriptor.script_name().to_string();

    let output = state.bridge.invoke(descriptor).await?;
    tracing::debug!(
        %script,
        duration_ms = output.duration_ms,
        "Recommendation job completed"
    );

    Ok(Json(output.value))
}
