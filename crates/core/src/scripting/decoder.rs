//! Worker output decoding.
//!
//! A worker that exits 0 must print exactly one JSON document on stdout.
//! A top-level, non-empty `error` field is how a worker reports a domain
//! failure (unknown movie id, empty catalogue, ...); anything else is the
//! payload returned to the client.

use serde_json::Value;

use super::executor::BridgeError;

/// Name of the field a worker sets to report a domain error.
pub const ERROR_FIELD: &str = "error";

/// Classified worker document.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerReply {
    /// The worker produced a result document.
    Success(Value),
    /// The worker ran correctly and reported a domain error.
    Failure(String),
}

impl WorkerReply {
    /// Classify a parsed document.
    ///
    /// `error` values of `null`, `false` or an empty/blank string are treated
    /// as absent. String errors are used verbatim; any other JSON value is
    /// rendered as JSON text.
    pub fn classify(document: Value) -> Self {
        let message = match document.get(ERROR_FIELD) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        match message {
            Some(message) => Self::Failure(message),
            None => Self::Success(document),
        }
    }

    /// Convert into the bridge's result shape.
    pub fn into_result(self) -> Result<Value, BridgeError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(message) => Err(BridgeError::Application(message)),
        }
    }
}

/// Parse finalized stdout into a [`WorkerReply`].
///
/// Surrounding whitespace is ignored. Empty output, invalid UTF-8 and
/// invalid JSON are [`BridgeError::Decode`] with the raw output attached.
pub fn decode(stdout: &[u8]) -> Result<WorkerReply, BridgeError> {
    let document = stdout.trim_ascii();
    if document.is_empty() {
        return Err(BridgeError::Decode {
            reason: "worker produced no output".to_string(),
            raw_output: String::from_utf8_lossy(stdout).into_owned(),
        });
    }

    match serde_json::from_slice::<Value>(document) {
        Ok(document) => Ok(WorkerReply::classify(document)),
        Err(e) => Err(BridgeError::Decode {
            reason: e.to_string(),
            raw_output: String::from_utf8_lossy(stdout).into_owned(),
        }),
    }
}

/// Reword a decode failure of output that hit the capture cap.
pub fn note_truncation(err: BridgeError, limit: usize) -> BridgeError {
    match err {
        BridgeError::Decode { reason, raw_output } => BridgeError::Decode {
            reason: format!("output exceeded the {limit}-byte cap and was truncated ({reason})"),
            raw_output,
        },
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
