use axum::routing::get;
use axum::Router;

use crate::handlers::recommendations;
use crate::state::AppState;

/// Mount recommendation routes (nested under `/api/movies`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recommend/{id}", get(recommendations::recommend_similar))
        .route("/search", get(recommendations::search_by_keywords))
        .route(
            "/preference-recommendations",
            get(recommendations::recommend_by_preference),
        )
}
