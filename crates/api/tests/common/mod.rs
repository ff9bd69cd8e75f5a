#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use cinerec_api::config::{ServerConfig, WorkerConfig};
use cinerec_api::router::build_app_router;
use cinerec_api::state::AppState;
use cinerec_core::scripting::bridge::ScriptBridge;

/// Build a test `ServerConfig` whose workers are `{dir}/{name}.sh` shell
/// scripts run with `sh`.
///
/// Uses a 5-second worker budget and a 30-second request timeout.
pub fn test_config(script_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        worker: WorkerConfig {
            runtime: "sh".to_string(),
            script_dir: script_dir.to_path_buf(),
            script_extension: "sh".to_string(),
            timeout_secs: 5,
            max_output_bytes: 1024 * 1024,
            database_uri: None,
            database_name: None,
        },
    }
}

/// Build the full application router from `config`, with the same
/// middleware stack production uses.
pub fn build_test_app(config: ServerConfig) -> Router {
    let bridge = Arc::new(ScriptBridge::new(config.worker.bridge_config()));
    let state = AppState {
        config: Arc::new(config.clone()),
        bridge,
        runtime_available: true,
    };
    build_app_router(state, &config).expect("test router")
}

/// Write `{dir}/{name}.sh` containing `body`. The worker receives the JSON
/// payload as `$1`.
pub fn write_worker(dir: &Path, name: &str, body: &str) {
    let path = dir.join(format!("{name}.sh"));
    let mut f = std::fs::File::create(&path).expect("create worker script");
    write!(f, "{body}").expect("write worker body");
}

/// Send a GET request through the router.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request"),
    )
    .await
    .expect("infallible router")
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("JSON body")
}
