//! Job descriptors, job outputs, and the bridge error taxonomy.
//!
//! Defines [`JobDescriptor`] (what to run), [`ScriptOutput`] (what a
//! successful run produced), [`BridgeError`] (every way a run can fail) and
//! [`ErrorKind`], the stable classification callers map to HTTP statuses.

use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;

/// Terminal outcome of one job.
pub type JobResult = Result<ScriptOutput, BridgeError>;

/// Immutable description of one worker invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDescriptor {
    script_name: String,
    payload: Value,
}

impl JobDescriptor {
    /// Build a descriptor, rejecting script names that are not plain
    /// identifiers (`[A-Za-z0-9_-]+`).
    ///
    /// The name becomes a file name under the script directory, so path
    /// separators and dots are refused outright.
    pub fn new(script_name: impl Into<String>, payload: Value) -> Result<Self, CoreError> {
        let script_name = script_name.into();
        if !is_valid_script_name(&script_name) {
            return Err(CoreError::Validation(format!(
                "Invalid script name: '{script_name}'"
            )));
        }
        Ok(Self {
            script_name,
            payload,
        })
    }

    /// Build a descriptor from any serializable payload.
    pub fn from_serializable<T: Serialize>(
        script_name: impl Into<String>,
        payload: &T,
    ) -> Result<Self, CoreError> {
        let payload = serde_json::to_value(payload)
            .map_err(|e| CoreError::Validation(format!("Payload is not serializable: {e}")))?;
        Self::new(script_name, payload)
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The payload as the single JSON text argument handed to the worker.
    pub fn payload_argument(&self) -> String {
        self.payload.to_string()
    }
}

fn is_valid_script_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Output of a job that ran to completion and produced a usable document.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptOutput {
    /// The decoded stdout document.
    pub value: Value,
    /// Complete stderr captured from the process (workers log progress here).
    pub stderr: String,
    /// Process exit code (always `0` for a successful job).
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Stable classification of a job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bad or missing request parameters, detected before any process starts.
    Validation,
    /// The worker runtime or script could not be started.
    Spawn,
    /// The worker exited with a non-zero status or was killed by a signal.
    NonZeroExit,
    /// The worker exited cleanly but stdout was not a JSON document.
    Decode,
    /// The worker ran fine and reported a domain error in its output.
    ApplicationError,
    /// The job exceeded its time budget and the worker was killed.
    Timeout,
    /// The job was cancelled by its caller and the worker was killed.
    Cancelled,
}

impl ErrorKind {
    /// Wire code for this kind, identical to its serialized form.
    pub fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::Spawn => "SPAWN",
            Self::NonZeroExit => "NON_ZERO_EXIT",
            Self::Decode => "DECODE",
            Self::ApplicationError => "APPLICATION_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether the failure was caused by the client's request.
    pub fn is_client_error(self) -> bool {
        matches!(self, Self::Validation | Self::ApplicationError)
    }
}

/// Errors that can end a job.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The worker runtime executable could not be started.
    #[error("Failed to start worker runtime '{program}': {source}{}", spawn_hint(.source, .program))]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The worker script does not exist under the script directory.
    #[error("Worker script not found: {0}")]
    ScriptNotFound(String),

    /// The worker terminated abnormally. `message` is the captured stderr
    /// when there is any, otherwise a description of the exit status.
    #[error("{message}")]
    NonZeroExit {
        exit_code: Option<i32>,
        signal: Option<i32>,
        message: String,
        stderr: String,
    },

    /// Stdout was empty or not valid JSON.
    #[error("Worker output is not valid JSON: {reason}")]
    Decode { reason: String, raw_output: String },

    /// The worker reported a domain error through the `error` field.
    #[error("{0}")]
    Application(String),

    #[error("Worker timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Worker cancelled after {elapsed_ms}ms")]
    Cancelled { elapsed_ms: u64 },
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Spawn { .. } | Self::ScriptNotFound(_) => ErrorKind::Spawn,
            Self::NonZeroExit { .. } => ErrorKind::NonZeroExit,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Application(_) => ErrorKind::ApplicationError,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Raw diagnostic text attached to the failure, if any.
    ///
    /// Captured stderr for abnormal exits, raw stdout for decode failures.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::NonZeroExit { stderr, .. } if !stderr.is_empty() => Some(stderr),
            Self::Decode { raw_output, .. } => Some(raw_output),
            _ => None,
        }
    }

    /// True when the runtime executable itself was not found on the system.
    pub fn is_executable_missing(&self) -> bool {
        matches!(self, Self::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

fn spawn_hint(source: &std::io::Error, program: &str) -> String {
    if source.kind() == std::io::ErrorKind::NotFound {
        format!(
            " (make sure '{program}' is installed and on PATH; try '{program} --version' in a new terminal)"
        )
    } else {
        String::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
