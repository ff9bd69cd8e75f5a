//! Bridge facade used by request handlers.
//!
//! [`ScriptBridge`] is held in application state as an `Arc` and shared by
//! all requests. Each [`invoke`](ScriptBridge::invoke) runs one job on its
//! own supervisor task; the only shared data is the immutable
//! [`BridgeConfig`].

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::collector::DEFAULT_MAX_OUTPUT_BYTES;
use super::environment::EnvironmentContext;
use super::executor::{BridgeError, JobDescriptor, JobResult};
use super::launcher;
use super::supervisor::JobSupervisor;

/// Default per-job time budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Budget for the `--version` runtime check.
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings shared by every job.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Interpreter executable (e.g. `python3`).
    pub runtime: String,
    /// Directory holding the worker scripts.
    pub script_dir: PathBuf,
    /// Extension appended to the script name (`py`); empty for none.
    pub script_extension: String,
    /// Wall-clock budget per job.
    pub timeout: Duration,
    /// Cap on bytes kept per output stream.
    pub max_output_bytes: usize,
    /// Variables injected into every worker.
    pub environment: Arc<EnvironmentContext>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            runtime: launcher::default_runtime().to_string(),
            script_dir: PathBuf::from("ml"),
            script_extension: "py".to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            environment: Arc::new(EnvironmentContext::new()),
        }
    }
}

impl BridgeConfig {
    /// Location of the worker script for `script_name`.
    pub fn script_path(&self, script_name: &str) -> PathBuf {
        if self.script_extension.is_empty() {
            self.script_dir.join(script_name)
        } else {
            self.script_dir
                .join(format!("{script_name}.{}", self.script_extension))
        }
    }
}

/// Runs worker jobs on behalf of request handlers.
pub struct ScriptBridge {
    config: Arc<BridgeConfig>,
    shutdown: CancellationToken,
}

impl ScriptBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Run one job to completion.
    ///
    /// Dropping the returned future cancels the job; the worker is still
    /// killed and reaped in the background.
    pub async fn invoke(&self, descriptor: JobDescriptor) -> JobResult {
        self.invoke_with_cancel(descriptor, CancellationToken::new())
            .await
    }

    /// Run one job, cancelling it when `cancel` fires.
    pub async fn invoke_with_cancel(
        &self,
        descriptor: JobDescriptor,
        cancel: CancellationToken,
    ) -> JobResult {
        let started = Instant::now();
        let job_cancel = self.shutdown.child_token();
        let _abandon_guard = job_cancel.clone().drop_guard();

        let supervisor = JobSupervisor::new(Arc::clone(&self.config));
        let job_id = supervisor.job_id();
        let mut task = tokio::spawn(supervisor.run(descriptor, job_cancel.clone()));

        let joined = tokio::select! {
            joined = &mut task => joined,
            () = cancel.cancelled() => {
                job_cancel.cancel();
                task.await
            }
        };

        joined.unwrap_or_else(|e| {
            tracing::error!(%job_id, error = %e, "Supervisor task did not complete");
            Err(BridgeError::Cancelled {
                elapsed_ms: started.elapsed().as_millis() as u64,
            })
        })
    }

    /// Cancel every in-flight job. Jobs started afterwards are cancelled
    /// before they spawn anything.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Check that the configured runtime starts, returning its version line.
    pub async fn check_runtime(&self) -> Result<String, BridgeError> {
        let runtime = &self.config.runtime;
        let mut cmd = tokio::process::Command::new(runtime);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(VERSION_CHECK_TIMEOUT, cmd.output())
            .await
            .map_err(|_| BridgeError::Timeout {
                elapsed_ms: VERSION_CHECK_TIMEOUT.as_millis() as u64,
            })?
            .map_err(|source| BridgeError::Spawn {
                program: runtime.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(BridgeError::NonZeroExit {
                exit_code: output.status.code(),
                signal: None,
                message: format!("'{runtime} --version' failed: {stderr}"),
                stderr,
            });
        }

        // Older interpreters print the version on stderr.
        Ok(if stdout.is_empty() { stderr } else { stdout })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
