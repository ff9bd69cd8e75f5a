//! Worker process launcher.
//!
//! Spawns `<runtime> <script_path> <payload-json>` with piped stdout/stderr
//! and the configured environment, and wraps the child in a
//! [`ProcessHandle`] owned by the supervisor for the rest of the job.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use super::bridge::BridgeConfig;
use super::executor::{BridgeError, JobDescriptor};

/// Interpreter used to run workers when none is configured.
///
/// Windows installs expose `python`; everywhere else `python3` is the
/// name that reliably points at a Python 3 interpreter.
pub fn default_runtime() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

/// One live worker process.
///
/// Dropping the handle kills the process (`kill_on_drop`), so a handle can
/// never outlive its job even on an unexpected early return.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
}

impl ProcessHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Take the stdout pipe. Returns `None` after the first call.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take the stderr pipe. Returns `None` after the first call.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Wait for the process to exit and reap it.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// SIGKILL every process still in the worker's process group.
    ///
    /// Used after the worker itself has exited, to clean up children that
    /// outlived it. The group id stays reserved while any member is alive,
    /// so this cannot hit an unrelated process.
    pub fn kill_process_group(&self) -> io::Result<()> {
        match self.pid {
            #[cfg(unix)]
            Some(pid) => kill_process_group(pid),
            _ => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "no process group to signal",
            )),
        }
    }

    /// Send SIGKILL to the worker's process group, falling back to the
    /// worker alone.
    fn kill(&mut self) -> io::Result<()> {
        if self.kill_process_group().is_ok() {
            return Ok(());
        }
        self.child.start_kill()
    }

    /// Forcibly terminate the process and reap it.
    ///
    /// Kill delivery is retried once. The process is then waited on for at
    /// most `reap_grace`; if it still has not been reaped the handle is
    /// dropped, which leaves the zombie to tokio's background reaper.
    /// Returns the exit status when the process was reaped here.
    pub async fn terminate(mut self, reap_grace: Duration) -> Option<ExitStatus> {
        for attempt in 1..=2 {
            match self.kill() {
                Ok(()) => break,
                Err(e) if attempt == 1 => {
                    tracing::warn!(pid = ?self.pid, error = %e, "Kill failed, retrying once");
                }
                Err(e) => {
                    tracing::warn!(pid = ?self.pid, error = %e, "Kill failed twice, waiting anyway");
                }
            }
        }

        match tokio::time::timeout(reap_grace, self.child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                tracing::warn!(pid = ?self.pid, error = %e, "Failed to reap killed worker");
                None
            }
            Err(_) => {
                tracing::warn!(
                    pid = ?self.pid,
                    grace_ms = reap_grace.as_millis() as u64,
                    "Killed worker not reaped within grace period"
                );
                None
            }
        }
    }
}

/// SIGKILL every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) -> io::Result<()> {
    // SAFETY: plain syscall with no memory arguments.
    let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Spawn the worker for `descriptor`.
///
/// On Unix the worker leads a new process group so a forced termination
/// also reaches anything it forked.
///
/// Fails with [`BridgeError::ScriptNotFound`] when the script file is
/// missing and [`BridgeError::Spawn`] when the runtime cannot be started.
pub async fn launch(
    config: &BridgeConfig,
    descriptor: &JobDescriptor,
) -> Result<ProcessHandle, BridgeError> {
    let script_path = config.script_path(descriptor.script_name());
    let is_file = tokio::fs::metadata(&script_path)
        .await
        .is_ok_and(|meta| meta.is_file());
    if !is_file {
        return Err(BridgeError::ScriptNotFound(
            script_path.display().to_string(),
        ));
    }

    let mut cmd = Command::new(&config.runtime);
    cmd.arg(&script_path)
        .arg(descriptor.payload_argument())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    config.environment.apply(&mut cmd);

    let child = cmd.spawn().map_err(|source| BridgeError::Spawn {
        program: config.runtime.clone(),
        source,
    })?;
    let pid = child.id();

    tracing::debug!(
        pid = ?pid,
        runtime = %config.runtime,
        script = %script_path.display(),
        "Worker process spawned"
    );

    Ok(ProcessHandle { child, pid })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
