use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cinerec_core::error::CoreError;
use cinerec_core::scripting::executor::{BridgeError, ErrorKind};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent `{ "error", "code" }`
/// JSON bodies, where `code` is the [`ErrorKind`] wire code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A request rejected before any worker started.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A worker job that did not produce a result.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Core(err) => err.kind(),
            AppError::Bridge(err) => err.kind(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match &self {
            AppError::Core(CoreError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Bridge(err) if kind.is_client_error() => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Bridge(err) => {
                tracing::error!(kind = kind.code(), error = %err, "Recommendation job failed");
                (StatusCode::INTERNAL_SERVER_ERROR, public_message(kind).to_string())
            }
        };

        let body = json!({
            "error": message,
            "code": kind.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Client-facing text for server-side failures. Worker diagnostics stay in
/// the logs.
fn public_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Spawn => "The recommendation engine is unavailable",
        ErrorKind::Timeout => "The recommendation engine took too long to respond",
        ErrorKind::Cancelled => "The recommendation request was cancelled",
        _ => "An internal error occurred",
    }
}
