//! Per-job supervision.
//!
//! A [`JobSupervisor`] owns one job from spawn to terminal outcome:
//!
//! ```text
//! Spawning -> Running -> Draining -> Decoding -> Terminal
//! ```
//!
//! The time budget and the cancellation token are watched in every
//! non-terminal state. Whatever happens, the worker process is reaped before
//! the supervisor returns and exactly one [`JobResult`] is produced.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::bridge::BridgeConfig;
use super::collector::{CapturedOutput, OutputCollector};
use super::decoder;
use super::executor::{BridgeError, JobDescriptor, JobResult, ScriptOutput};
use super::launcher::{self, ProcessHandle};

/// How long to wait for a killed worker to be reaped.
pub const REAP_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle state of a supervised job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Spawning,
    Running,
    Draining,
    Decoding,
    Terminal,
}

/// Why the running phase ended.
enum RunEnd {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Why the draining phase ended.
enum DrainEnd {
    Closed(CapturedOutput),
    TimedOut,
    Cancelled,
}

/// Drives a single job through its state machine.
pub struct JobSupervisor {
    job_id: Uuid,
    config: Arc<BridgeConfig>,
    state: JobState,
}

impl JobSupervisor {
    pub fn new(config: Arc<BridgeConfig>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            config,
            state: JobState::Spawning,
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Run `descriptor` to a terminal outcome.
    ///
    /// The budget (`config.timeout`) starts now and covers spawning,
    /// running and draining.
    pub async fn run(mut self, descriptor: JobDescriptor, cancel: CancellationToken) -> JobResult {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.timeout;

        tracing::info!(
            job_id = %self.job_id,
            script = descriptor.script_name(),
            timeout_ms = self.config.timeout.as_millis() as u64,
            "Starting worker job"
        );

        let result = self.drive(&descriptor, &cancel, started, deadline).await;
        self.transition(JobState::Terminal);

        match &result {
            Ok(output) => tracing::info!(
                job_id = %self.job_id,
                script = descriptor.script_name(),
                duration_ms = output.duration_ms,
                "Worker job succeeded"
            ),
            Err(e) => tracing::warn!(
                job_id = %self.job_id,
                script = descriptor.script_name(),
                kind = e.kind().code(),
                elapsed_ms = elapsed_ms(started),
                error = %e,
                diagnostic = e.diagnostic().unwrap_or_default(),
                "Worker job failed"
            ),
        }
        result
    }

    async fn drive(
        &mut self,
        descriptor: &JobDescriptor,
        cancel: &CancellationToken,
        started: Instant,
        deadline: tokio::time::Instant,
    ) -> JobResult {
        if cancel.is_cancelled() {
            return Err(BridgeError::Cancelled {
                elapsed_ms: elapsed_ms(started),
            });
        }

        let mut handle = launcher::launch(&self.config, descriptor).await?;
        self.transition(JobState::Running);

        let collector = OutputCollector::start(
            handle.take_stdout(),
            handle.take_stderr(),
            self.config.max_output_bytes,
            self.job_id,
        );

        let run_end = tokio::select! {
            status = handle.wait() => RunEnd::Exited(status),
            () = tokio::time::sleep_until(deadline) => RunEnd::TimedOut,
            () = cancel.cancelled() => RunEnd::Cancelled,
        };

        let status = match run_end {
            RunEnd::Exited(Ok(status)) => status,
            RunEnd::Exited(Err(e)) => {
                self.force_terminate(handle).await;
                return Err(BridgeError::NonZeroExit {
                    exit_code: None,
                    signal: None,
                    message: format!("Lost track of worker process: {e}"),
                    stderr: String::new(),
                });
            }
            RunEnd::TimedOut => {
                self.force_terminate(handle).await;
                return Err(BridgeError::Timeout {
                    elapsed_ms: elapsed_ms(started),
                });
            }
            RunEnd::Cancelled => {
                self.force_terminate(handle).await;
                return Err(BridgeError::Cancelled {
                    elapsed_ms: elapsed_ms(started),
                });
            }
        };
        self.transition(JobState::Draining);

        // A grandchild that inherited the pipes can keep them open after the
        // worker exits, so draining is bounded by the same deadline.
        let drain_end = tokio::select! {
            output = collector.finish() => DrainEnd::Closed(output),
            () = tokio::time::sleep_until(deadline) => DrainEnd::TimedOut,
            () = cancel.cancelled() => DrainEnd::Cancelled,
        };
        // Whatever the worker forked must not outlive the job, even when it
        // closed its pipes and let draining finish.
        self.kill_leftovers(&handle);
        let output = match drain_end {
            DrainEnd::Closed(output) => output,
            DrainEnd::TimedOut => {
                return Err(BridgeError::Timeout {
                    elapsed_ms: elapsed_ms(started),
                });
            }
            DrainEnd::Cancelled => {
                return Err(BridgeError::Cancelled {
                    elapsed_ms: elapsed_ms(started),
                });
            }
        };

        if !status.success() {
            return Err(non_zero_exit(status, &output));
        }

        self.transition(JobState::Decoding);
        let reply = decoder::decode(output.stdout.as_bytes()).map_err(|e| {
            if output.stdout.is_truncated() {
                decoder::note_truncation(e, self.config.max_output_bytes)
            } else {
                e
            }
        })?;
        let value = reply.into_result()?;

        Ok(ScriptOutput {
            value,
            stderr: output.stderr.to_text(),
            exit_code: 0,
            duration_ms: elapsed_ms(started),
        })
    }

    async fn force_terminate(&self, handle: ProcessHandle) {
        let pid = handle.pid();
        let status = handle.terminate(REAP_GRACE).await;
        tracing::debug!(job_id = %self.job_id, pid = ?pid, ?status, "Worker terminated");
    }

    /// Kill whatever the exited worker left behind in its process group.
    fn kill_leftovers(&self, handle: &ProcessHandle) {
        match handle.kill_process_group() {
            Ok(()) => {
                tracing::debug!(job_id = %self.job_id, "Killed leftover worker processes");
            }
            Err(e) => {
                tracing::trace!(job_id = %self.job_id, error = %e, "No leftover worker processes");
            }
        }
    }

    fn transition(&mut self, next: JobState) {
        tracing::debug!(
            job_id = %self.job_id,
            from = ?self.state,
            to = ?next,
            "Job state transition"
        );
        self.state = next;
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Build the failure for a worker that did not exit with status 0.
///
/// The trimmed stderr is the message; when the worker wrote nothing to
/// stderr the exit status is described instead.
fn non_zero_exit(status: ExitStatus, output: &CapturedOutput) -> BridgeError {
    let exit_code = status.code();
    let signal = exit_signal(status);
    let stderr = output.stderr.to_text();
    let message = match (stderr.trim(), exit_code, signal) {
        (text, _, _) if !text.is_empty() => text.to_string(),
        (_, Some(code), _) => format!("Worker exited with code {code}"),
        (_, None, Some(sig)) => format!("Worker was killed by signal {sig}"),
        (_, None, None) => "Worker terminated abnormally".to_string(),
    };
    BridgeError::NonZeroExit {
        exit_code,
        signal,
        message,
        stderr,
    }
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
