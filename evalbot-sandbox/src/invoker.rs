//! Timed invocation of isolated worker processes

use std::future::Future;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Errors surfaced by [`TimedInvoker`].
///
/// All variants are recoverable at the call site; none are expected to
/// propagate past the runner boundary.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The operation exceeded its deadline and was terminated.
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    /// The worker process could not be started at all.
    #[error("failed to start worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker started but its lifecycle could not be tracked.
    #[error("failed waiting on worker: {0}")]
    Wait(#[source] std::io::Error),
}

/// Captured output of one worker run.
#[derive(Debug, Default)]
pub struct WorkerOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub status: Option<ExitStatus>,
}

impl WorkerOutput {
    pub fn exited_cleanly(&self) -> bool {
        self.status.map(|s| s.success()).unwrap_or(false)
    }
}

/// Runs worker processes under a hard wall-clock deadline.
///
/// Each worker is placed in its own process group, so a nested helper
/// process spawned by the worker dies with it when the deadline fires. The
/// invoker never blocks past `timeout` plus the termination grace period.
#[derive(Debug, Clone)]
pub struct TimedInvoker {
    /// Grace period between SIGTERM and SIGKILL on deadline expiry.
    kill_grace: Duration,
}

impl Default for TimedInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl TimedInvoker {
    pub fn new() -> Self {
        Self {
            kill_grace: Duration::from_millis(500),
        }
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// Run a prepared worker command, reading at most one batch of output.
    ///
    /// `timeout = None` waits indefinitely and is reserved for trusted
    /// internal calls; untrusted code must always come with a deadline.
    pub async fn run(
        &self,
        mut command: Command,
        timeout: Option<Duration>,
    ) -> Result<WorkerOutput, InvokeError> {
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(InvokeError::Spawn)?;
        let stdout_task = spawn_line_reader(child.stdout.take());
        let stderr_task = spawn_line_reader(child.stderr.take());

        let status = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(Ok(status)) => status,
                Ok(Err(err)) => {
                    self.terminate(&mut child).await;
                    return Err(InvokeError::Wait(err));
                }
                Err(_) => {
                    self.terminate(&mut child).await;
                    return Err(InvokeError::TimedOut(limit));
                }
            },
            None => child.wait().await.map_err(InvokeError::Wait)?,
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(WorkerOutput {
            stdout,
            stderr,
            status: Some(status),
        })
    }

    /// Terminate the worker's whole process group: SIGTERM, a short grace
    /// period, then SIGKILL. The group id equals the child pid because the
    /// child was spawned with `process_group(0)`.
    #[cfg(unix)]
    async fn terminate(&self, child: &mut Child) {
        let pid = match child.id() {
            Some(id) => id as i32,
            // Already reaped.
            None => return,
        };

        // SAFETY: kill(2) with a valid signal number; -pid targets the group.
        let _ = unsafe { libc::kill(-pid, libc::SIGTERM) };
        if tokio::time::timeout(self.kill_grace, child.wait())
            .await
            .is_err()
        {
            let _ = unsafe { libc::kill(-pid, libc::SIGKILL) };
            let _ = child.wait().await;
        }
    }

    #[cfg(not(unix))]
    async fn terminate(&self, child: &mut Child) {
        let _ = child.kill().await;
    }
}

/// Run any long-running side-effecting future under the same deadline
/// contract as a worker process.
pub async fn run_timed<F, T>(op: F, timeout: Option<Duration>) -> Result<T, InvokeError>
where
    F: Future<Output = T>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, op)
            .await
            .map_err(|_| InvokeError::TimedOut(limit)),
        None => Ok(op.await),
    }
}

fn spawn_line_reader<R>(stream: Option<R>) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = Vec::new();
        if let Some(stream) = stream {
            let mut reader = BufReader::new(stream).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                lines.push(line);
            }
        }
        lines
    })
}
