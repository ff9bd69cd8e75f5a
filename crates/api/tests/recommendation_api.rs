//! Integration tests for the recommendation endpoints.
//!
//! Workers are small shell scripts in a temp directory, so these tests
//! exercise the real bridge (spawn, collect, decode) without Python.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, test_config, write_worker};
use serde_json::json;

/// Worker that echoes its payload back as the result document.
const ECHO_PAYLOAD: &str = "printf '{\"received\": %s}' \"$1\"\n";

// ---------------------------------------------------------------------------
// Test: similar-movie request returns the worker document
// ---------------------------------------------------------------------------

#[tokio::test]
async fn similar_movies_returns_worker_document() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_worker(
        dir.path(),
        "movie_recommender",
        r#"echo '{"recommendations":[{"id":"1"},{"id":"2"},{"id":"3"},{"id":"4"},{"id":"5"}]}'"#,
    );
    let app = build_test_app(test_config(dir.path()));

    let response = get(app, "/api/movies/recommend/573a1391f29313caabcd8828?num_rec=5").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["recommendations"].as_array().unwrap().len(), 5);
}

// ---------------------------------------------------------------------------
// Test: the success body is the worker document itself, not an envelope
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_body_is_the_worker_document_unwrapped() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_worker(
        dir.path(),
        "movie_recommender",
        r#"echo '{"data":"from worker","recommendations":[]}'"#,
    );
    let app = build_test_app(test_config(dir.path()));

    let response = get(app, "/api/movies/recommend/abc").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json, json!({"data": "from worker", "recommendations": []}));
}

// ---------------------------------------------------------------------------
// Test: the worker receives the expected payload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn similar_movies_payload_reaches_worker() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_worker(dir.path(), "movie_recommender", ECHO_PAYLOAD);
    let app = build_test_app(test_config(dir.path()));

    let response = get(app, "/api/movies/recommend/abc123?num_rec=500").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["received"],
        json!({"movie_id": "abc123", "num_recommendations": 100})
    );
}

#[tokio::test]
async fn search_payload_uses_default_count() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_worker(dir.path(), "movie_recommender", ECHO_PAYLOAD);
    let app = build_test_app(test_config(dir.path()));

    let response = get(app, "/api/movies/search?keywords=space%20heist&num_rec=abc").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["received"],
        json!({"search_keywords": "space heist", "num_recommendations": 10})
    );
}

#[tokio::test]
async fn preference_payload_contains_only_supplied_filters() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_worker(dir.path(), "preference_recommender", ECHO_PAYLOAD);
    let app = build_test_app(test_config(dir.path()));

    let response = get(
        app,
        "/api/movies/preference-recommendations?genres=Drama,Comedy&cast=&min_year=1990&num_rec=3",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["received"],
        json!({"num_recommendations": 3, "genres": "Drama,Comedy", "min_year": 1990})
    );
}

// ---------------------------------------------------------------------------
// Test: validation failures never start a worker
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_preferences_return_400_without_spawning() {
    let dir = tempfile::tempdir().expect("temp dir");
    let marker = dir.path().join("spawned");
    write_worker(
        dir.path(),
        "preference_recommender",
        &format!("touch '{}'\necho '{{}}'\n", marker.display()),
    );
    let app = build_test_app(test_config(dir.path()));

    let response = get(
        app,
        "/api/movies/preference-recommendations?genres=&cast=&directors=&num_rec=5",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION");
    assert!(!marker.exists(), "no worker may run for a rejected request");
}

#[tokio::test]
async fn missing_keywords_return_400() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = build_test_app(test_config(dir.path()));

    let response = get(app, "/api/movies/search?keywords=%20%20").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION");
}

#[tokio::test]
async fn non_positive_count_returns_400() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = build_test_app(test_config(dir.path()));

    let response = get(app, "/api/movies/recommend/abc?num_rec=0").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION");
}

// ---------------------------------------------------------------------------
// Test: worker failures map to their error kinds
// ---------------------------------------------------------------------------

#[tokio::test]
async fn worker_error_field_returns_400_with_message() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_worker(
        dir.path(),
        "movie_recommender",
        r#"echo '{"error": "Movie not found"}'"#,
    );
    let app = build_test_app(test_config(dir.path()));

    let response = get(app, "/api/movies/recommend/does-not-exist").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "APPLICATION_ERROR");
    assert_eq!(json["error"], "Movie not found");
}

#[tokio::test]
async fn crashing_worker_returns_500_non_zero_exit() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_worker(
        dir.path(),
        "movie_recommender",
        "echo '{\"recommendations\": []}'\necho 'model not loaded' >&2\nexit 1\n",
    );
    let app = build_test_app(test_config(dir.path()));

    let response = get(app, "/api/movies/recommend/abc").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NON_ZERO_EXIT");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn garbage_output_returns_500_decode() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_worker(dir.path(), "movie_recommender", "echo 'loading model...'\n");
    let app = build_test_app(test_config(dir.path()));

    let response = get(app, "/api/movies/search?keywords=noir").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "DECODE");
}

#[tokio::test]
async fn missing_script_returns_500_spawn() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = build_test_app(test_config(dir.path()));

    let response = get(app, "/api/movies/recommend/abc").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "SPAWN");
}

#[tokio::test]
async fn missing_runtime_returns_500_spawn() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_worker(dir.path(), "movie_recommender", ECHO_PAYLOAD);
    let mut config = test_config(dir.path());
    config.worker.runtime = "no-such-python-runtime".to_string();
    let app = build_test_app(config);

    let response = get(app, "/api/movies/recommend/abc").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "SPAWN");
}

#[tokio::test]
async fn hanging_worker_returns_500_timeout_within_budget() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_worker(dir.path(), "movie_recommender", "sleep 30\n");
    let mut config = test_config(dir.path());
    config.worker.timeout_secs = 1;
    let app = build_test_app(config);

    let started = std::time::Instant::now();
    let response = get(app, "/api/movies/recommend/abc").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "TIMEOUT");
    assert!(started.elapsed() < Duration::from_secs(5));
}

// ---------------------------------------------------------------------------
// Test: database settings reach the worker environment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn database_settings_are_passed_to_worker() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_worker(
        dir.path(),
        "movie_recommender",
        "printf '{\"uri\": \"%s\", \"name\": \"%s\"}' \"$MONGODB_URI\" \"$DB_NAME\"\n",
    );
    let mut config = test_config(dir.path());
    config.worker.database_uri = Some("mongodb://db:27017".to_string());
    let app = build_test_app(config);

    let response = get(app, "/api/movies/recommend/abc").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json, json!({"uri": "mongodb://db:27017", "name": ""}));
}
