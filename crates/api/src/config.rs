use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use cinerec_core::scripting::bridge::{BridgeConfig, DEFAULT_TIMEOUT};
use cinerec_core::scripting::collector::DEFAULT_MAX_OUTPUT_BYTES;
use cinerec_core::scripting::environment::{
    EnvironmentContext, DATABASE_NAME_VAR, DATABASE_URI_VAR,
};
use cinerec_core::scripting::launcher::default_runtime;

/// Configuration errors surfaced at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid CORS origin '{origin}'")]
    InvalidCorsOrigin { origin: String },
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    /// `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long in-flight requests may drain after a shutdown signal before
    /// their workers are cancelled (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Recommender worker settings.
    pub worker: WorkerConfig,
}

/// Settings for the external recommender workers.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub runtime: String,
    pub script_dir: PathBuf,
    pub script_extension: String,
    pub timeout_secs: u64,
    pub max_output_bytes: usize,
    /// Passed to workers as `MONGODB_URI`.
    pub database_uri: Option<String>,
    /// Passed to workers as `DB_NAME`.
    pub database_name: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime().to_string(),
            script_dir: PathBuf::from("ml"),
            script_extension: "py".to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            database_uri: None,
            database_name: None,
        }
    }
}

impl WorkerConfig {
    /// Bridge settings for these workers. Unset database variables are
    /// still passed to workers, as empty strings.
    pub fn bridge_config(&self) -> BridgeConfig {
        let environment = EnvironmentContext::new()
            .with_var(DATABASE_URI_VAR, self.database_uri.clone())
            .with_var(DATABASE_NAME_VAR, self.database_name.clone());

        BridgeConfig {
            runtime: self.runtime.clone(),
            script_dir: self.script_dir.clone(),
            script_extension: self.script_extension.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_output_bytes: self.max_output_bytes,
            environment: Arc::new(environment),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                  |
    /// |---------------------------|--------------------------|
    /// | `HOST`                    | `0.0.0.0`                |
    /// | `PORT`                    | `3000`                   |
    /// | `CORS_ORIGINS`            | `*`                      |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                     |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                     |
    /// | `WORKER_RUNTIME`          | `python3` (`python` on Windows) |
    /// | `WORKER_SCRIPT_DIR`       | `ml`                     |
    /// | `WORKER_SCRIPT_EXTENSION` | `py`                     |
    /// | `WORKER_TIMEOUT_SECS`     | `20`                     |
    /// | `WORKER_MAX_OUTPUT_BYTES` | `10485760`               |
    /// | `MONGODB_URI`             | unset                    |
    /// | `DB_NAME`                 | unset                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_var(&lookup, "PORT", 3000u16)?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_positive(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let shutdown_timeout_secs = parse_var(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30u64)?;

        let defaults = WorkerConfig::default();
        let worker = WorkerConfig {
            runtime: non_empty(lookup("WORKER_RUNTIME")).unwrap_or(defaults.runtime),
            script_dir: non_empty(lookup("WORKER_SCRIPT_DIR"))
                .map(PathBuf::from)
                .unwrap_or(defaults.script_dir),
            script_extension: lookup("WORKER_SCRIPT_EXTENSION")
                .map(|s| s.trim().trim_start_matches('.').to_string())
                .unwrap_or(defaults.script_extension),
            timeout_secs: parse_positive(&lookup, "WORKER_TIMEOUT_SECS", defaults.timeout_secs)?,
            max_output_bytes: parse_positive(
                &lookup,
                "WORKER_MAX_OUTPUT_BYTES",
                defaults.max_output_bytes as u64,
            )? as usize,
            database_uri: lookup(DATABASE_URI_VAR),
            database_name: lookup(DATABASE_NAME_VAR),
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            worker,
        })
    }

    /// True when a worker can run longer than the HTTP layer waits for it.
    pub fn worker_outlives_request(&self) -> bool {
        self.worker.timeout_secs >= self.request_timeout_secs
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup(var)) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_positive<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let parsed = parse_var(lookup, var, default)?;
    if parsed == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
