pub mod health;
pub mod movies;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /movies/recommend/{id}                   similar movies (?num_rec)
/// /movies/search                           keyword search (?keywords, ?num_rec)
/// /movies/preference-recommendations       preference match (?num_rec, ?genres,
///                                          ?cast, ?directors, ?writers,
///                                          ?languages, ?countries,
///                                          ?min_year, ?max_year)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/movies", movies::router())
}
