//! Worker output collection.
//!
//! Each pipe is drained on its own task from spawn until EOF, so the worker
//! can never block on a full pipe while the supervisor waits for it to
//! exit. Buffers are only handed out once both streams have closed.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{ChildStderr, ChildStdout};
use tokio_util::task::AbortOnDropHandle;
use uuid::Uuid;

/// Read size for each pipe read.
const CHUNK_SIZE: usize = 8 * 1024;

/// Default cap on bytes kept per stream (10 MiB).
///
/// Output beyond the cap is still read (so the worker is never blocked) but
/// discarded.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Stdout,
    Stderr,
}

/// Everything read from one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedStream {
    bytes: Vec<u8>,
    truncated: bool,
}

impl CapturedStream {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True when the stream produced more than the configured cap.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Lossy UTF-8 rendering of the captured bytes.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    fn append(&mut self, chunk: &[u8], limit: usize) {
        let room = limit.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
}

/// Finalized stdout and stderr of one job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: CapturedStream,
    pub stderr: CapturedStream,
}

/// Background drain of a worker's stdout and stderr.
///
/// Dropping the collector aborts both drain tasks, which closes the read
/// ends of the pipes.
pub struct OutputCollector {
    stdout: AbortOnDropHandle<CapturedStream>,
    stderr: AbortOnDropHandle<CapturedStream>,
}

impl OutputCollector {
    /// Start draining both pipes. A missing pipe yields an empty stream.
    pub fn start(
        stdout: Option<ChildStdout>,
        stderr: Option<ChildStderr>,
        limit: usize,
        job_id: Uuid,
    ) -> Self {
        Self {
            stdout: AbortOnDropHandle::new(tokio::spawn(drain(
                stdout,
                limit,
                StreamKind::Stdout,
                job_id,
            ))),
            stderr: AbortOnDropHandle::new(tokio::spawn(drain(
                stderr,
                limit,
                StreamKind::Stderr,
                job_id,
            ))),
        }
    }

    /// Wait until both streams reach EOF and return what they produced.
    pub async fn finish(self) -> CapturedOutput {
        let (stdout, stderr) = tokio::join!(self.stdout, self.stderr);
        CapturedOutput {
            stdout: stdout.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "stdout drain task failed");
                CapturedStream::default()
            }),
            stderr: stderr.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "stderr drain task failed");
                CapturedStream::default()
            }),
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(
    reader: Option<R>,
    limit: usize,
    kind: StreamKind,
    job_id: Uuid,
) -> CapturedStream {
    let mut captured = CapturedStream::default();
    let Some(mut reader) = reader else {
        return captured;
    };

    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if kind == StreamKind::Stderr {
                    let text = String::from_utf8_lossy(&chunk[..n]);
                    tracing::debug!(%job_id, stderr = %text.trim_end(), "Worker stderr");
                }
                captured.append(&chunk[..n], limit);
            }
            Err(e) => {
                tracing::warn!(%job_id, stream = ?kind, error = %e, "Worker pipe read failed");
                break;
            }
        }
    }

    if captured.truncated {
        tracing::warn!(%job_id, stream = ?kind, limit, "Worker output truncated");
    }
    captured
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
