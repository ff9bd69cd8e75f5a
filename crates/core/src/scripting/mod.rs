//! External script invocation bridge.
//!
//! Runs one recommender worker process per request: the launcher spawns it,
//! the collector drains its output, the decoder interprets stdout, and the
//! supervisor ties them together under a time budget. [`bridge::ScriptBridge`]
//! is the entry point used by request handlers.

pub mod bridge;
pub mod collector;
pub mod decoder;
pub mod environment;
pub mod executor;
pub mod launcher;
pub mod supervisor;

/// Shared test helpers for bridge tests.
#[cfg(test)]
pub(crate) mod test_helpers {
    use std::io::Write;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use super::bridge::BridgeConfig;
    use super::environment::EnvironmentContext;

    /// Build a [`BridgeConfig`] that runs `{dir}/{name}.sh` with `sh`.
    ///
    /// Uses a 5-second budget and a 1 MiB output cap so a misbehaving
    /// test fails quickly.
    pub fn shell_config(dir: &Path) -> BridgeConfig {
        BridgeConfig {
            runtime: "sh".to_string(),
            script_dir: dir.to_path_buf(),
            script_extension: "sh".to_string(),
            timeout: Duration::from_secs(5),
            max_output_bytes: 1024 * 1024,
            environment: Arc::new(EnvironmentContext::new()),
        }
    }

    /// Write `{dir}/{name}.sh` containing `body`.
    ///
    /// The worker receives the JSON payload as `$1`.
    pub fn write_worker(dir: &Path, name: &str, body: &str) {
        let path = dir.join(format!("{name}.sh"));
        let mut f = std::fs::File::create(&path).expect("create worker script");
        write!(f, "{body}").expect("write worker body");
    }
}
