// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handle to a running child process
//!
//! The child leads its own process group, so killing the group also takes
//! down anything it spawned. Stdout and stderr are drained by reader tasks
//! into shared buffers while the caller waits, so a chatty child can never
//! block on a full pipe and whatever was read survives an abandoned drain.
//!
//! Exit and end-of-output are separate events: a backgrounded descendant
//! inherits the pipes and can hold them open long after the child exits.

use super::{ProcessError, ProcessOutput};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;

/// How long [`ChildProcess::into_output`] waits for the pipes to close
pub const DRAIN_GRACE: Duration = Duration::from_secs(2);

pub struct ChildProcess {
    child: Child,
    pid: Option<u32>,
    stdout: OutputStream,
    stderr: OutputStream,
}

impl ChildProcess {
    pub(crate) fn from_child(mut child: Child) -> Self {
        let pid = child.id();
        let stdout = OutputStream::spawn(child.stdout.take());
        let stderr = OutputStream::spawn(child.stderr.take());
        Self {
            child,
            pid,
            stdout,
            stderr,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Wait for the process to exit. Cancel-safe: dropping the future
    /// leaves the process running and the handle usable.
    pub async fn wait(&mut self) -> Result<ExitStatus, ProcessError> {
        Ok(self.child.wait().await?)
    }

    /// Wait until both output streams reach end-of-file. Cancel-safe.
    pub async fn closed(&mut self) {
        self.stdout.closed().await;
        self.stderr.closed().await;
    }

    /// SIGKILL the whole process group, then reap the child
    pub async fn kill_tree(&mut self) -> Result<ExitStatus, ProcessError> {
        if let Some(pgid) = self.pid.and_then(|pid| i32::try_from(pid).ok()) {
            if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                tracing::debug!(pgid, error = %e, "killpg failed, killing child only");
            }
        }
        // Covers a child that already left its group or exited
        if let Err(e) = self.child.start_kill() {
            tracing::trace!(error = %e, "start_kill after killpg");
        }
        self.wait().await
    }

    /// Collect output once the process has been reaped.
    ///
    /// Waits at most [`DRAIN_GRACE`] for the pipes to close, then keeps
    /// whatever was read and stops reading.
    pub async fn into_output(mut self, status: Option<ExitStatus>, timed_out: bool) -> ProcessOutput {
        if tokio::time::timeout(DRAIN_GRACE, self.closed()).await.is_err() {
            tracing::warn!(pid = ?self.pid, "output still open after exit, keeping partial output");
        }
        ProcessOutput {
            exit_code: status.and_then(|s| s.code()),
            stdout: self.stdout.take(),
            stderr: self.stderr.take(),
            timed_out,
        }
    }
}

impl std::fmt::Debug for ChildProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildProcess").field("pid", &self.pid).finish()
    }
}

/// One piped stream and the task copying it into a buffer
struct OutputStream {
    buf: Arc<Mutex<Vec<u8>>>,
    reader: Option<JoinHandle<()>>,
}

impl OutputStream {
    fn spawn<R>(stream: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let reader = stream.map(|mut stream| {
            let buf = Arc::clone(&buf);
            tokio::spawn(async move {
                let mut chunk = [0u8; 8192];
                loop {
                    match stream.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => buf
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .extend_from_slice(&chunk[..n]),
                        Err(e) => {
                            tracing::debug!(error = %e, "output stream closed early");
                            break;
                        }
                    }
                }
            })
        });
        Self { buf, reader }
    }

    async fn closed(&mut self) {
        if let Some(reader) = self.reader.as_mut() {
            if let Err(e) = reader.await {
                tracing::warn!(error = %e, "output reader task failed");
            }
            self.reader = None;
        }
    }

    fn take(&mut self) -> String {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        let bytes = std::mem::take(&mut *self.buf.lock().unwrap_or_else(|e| e.into_inner()));
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if let Some(reader) = &self.reader {
            reader.abort();
        }
    }
}
