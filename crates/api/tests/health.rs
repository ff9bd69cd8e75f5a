//! Integration tests for the root routes and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, build_test_app, get, test_config};
use http_body_util::BodyExt;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = build_test_app(test_config(dir.path()));
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["worker_runtime"], "sh");
    assert_eq!(json["runtime_available"], true);
}

// ---------------------------------------------------------------------------
// Test: GET /health reports the configured timeouts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_configured_timeouts() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut config = test_config(dir.path());
    config.worker.timeout_secs = 7;
    config.request_timeout_secs = 45;
    let app = build_test_app(config);

    let json = body_json(get(app, "/health").await).await;
    assert_eq!(json["worker_timeout_secs"], 7);
    assert_eq!(json["request_timeout_secs"], 45);
}

// ---------------------------------------------------------------------------
// Test: GET / returns the welcome banner
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_returns_welcome_text() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = build_test_app(test_config(dir.path()));
    let response = get(app, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).starts_with("Welcome"));
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = build_test_app(test_config(dir.path()));
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = build_test_app(test_config(dir.path()));
    let response = get(app, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

// ---------------------------------------------------------------------------
// Test: Incoming x-request-id is propagated unchanged
// ---------------------------------------------------------------------------

#[tokio::test]
async fn incoming_request_id_is_propagated() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = build_test_app(test_config(dir.path()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-abc-123");
}

// ---------------------------------------------------------------------------
// Test: CORS preflight allows any origin by default
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = build_test_app(test_config(dir.path()));
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/movies/search")
                .header("origin", "http://frontend.test")
                .header("access-control-request-method", "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
