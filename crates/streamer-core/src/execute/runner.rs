//! Supervised execution of a single task.
//!
//! A run spawns the shell, pumps stdout and stderr into the task's sink and
//! races three events, first one wins:
//!
//! - cancellation broadcast: kill, outcome `Cancelled`
//! - deadline elapsed: kill, outcome `TimedOut`
//! - natural exit: `Succeeded` or `Failed`
//!
//! The losing arms are dropped without further effect.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout};

use super::context::{CancelHandle, RunCallback};
use super::RunOutcome;
use crate::config::{EngineConfig, ShellCommand};
use crate::error::{Error, Result};
use crate::sink::OutputSink;
use crate::task::TaskDescriptor;

const PUMP_CHUNK: usize = 8192;

/// Runs task descriptors as supervised shell processes.
///
/// Cheap to clone; every pool worker holds its own copy.
#[derive(Clone)]
pub struct ProcessRunner {
    shell: ShellCommand,
    dated_dir: PathBuf,
    callback: Option<Arc<dyn RunCallback>>,
}

impl ProcessRunner {
    /// Create a runner from the engine configuration.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            shell: config.shell.clone(),
            dated_dir: config.dated_dir.clone(),
            callback: None,
        }
    }

    /// Set the run callback for progress reporting.
    pub fn with_callback(mut self, callback: Arc<dyn RunCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Build the task's sink, then execute it.
    ///
    /// A sink that cannot be built means the process is never started.
    pub async fn run(&self, task: &TaskDescriptor, cancel: &CancelHandle) -> RunOutcome {
        match OutputSink::build(task, &self.dated_dir).await {
            Ok(sink) => self.execute(task, sink, cancel).await,
            Err(err) => {
                tracing::error!(task = %task.command(), error = %err, "[failed ] cannot build task output stream");
                let outcome = RunOutcome::SinkBuildFailed(err);
                self.notify_finished(task, &outcome);
                outcome
            }
        }
    }

    /// Execute `task`, writing all of its output into `sink`.
    ///
    /// Produces exactly one outcome. A cancellation broadcast before the call
    /// is still observed: the process is spawned and killed straight away.
    pub async fn execute(
        &self,
        task: &TaskDescriptor,
        sink: OutputSink,
        cancel: &CancelHandle,
    ) -> RunOutcome {
        let outcome = match RunHandle::spawn(&self.shell, task, sink) {
            Ok(handle) => {
                tracing::info!(pid = handle.pid, task = %task.command(), "[started]");
                if let Some(ref callback) = self.callback {
                    callback.on_run_started(task, handle.pid);
                }
                handle.supervise(task, cancel).await
            }
            Err(err) => {
                tracing::error!(task = %task.command(), error = %err, "[failed ] cannot start task");
                RunOutcome::StartFailed(err)
            }
        };

        self.notify_finished(task, &outcome);
        outcome
    }

    fn notify_finished(&self, task: &TaskDescriptor, outcome: &RunOutcome) {
        if let Some(ref callback) = self.callback {
            callback.on_run_finished(task, outcome);
        }
    }
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("shell", &self.shell)
            .field("dated_dir", &self.dated_dir)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

enum Race {
    Cancelled,
    TimedOut,
    Exited(Result<()>, std::io::Result<std::process::ExitStatus>),
}

/// A live run: the spawned child and the sink its output goes to.
///
/// Owned by exactly one supervising future and released on every exit path.
struct RunHandle {
    child: Child,
    pid: u32,
    sink: OutputSink,
}

impl RunHandle {
    fn spawn(shell: &ShellCommand, task: &TaskDescriptor, sink: OutputSink) -> Result<Self> {
        let child = shell.command(task.command()).spawn().map_err(Error::Spawn)?;
        // `id()` is only `None` after the child has been reaped.
        let pid = child.id().unwrap_or_default();
        Ok(Self { child, pid, sink })
    }

    async fn supervise(mut self, task: &TaskDescriptor, cancel: &CancelHandle) -> RunOutcome {
        let stdout = self.child.stdout.take();
        let stderr = self.child.stderr.take();

        let race = {
            let child = &mut self.child;
            let sink = &mut self.sink;
            let exited = async move {
                let pumped = pump(stdout, stderr, sink).await;
                let status = child.wait().await;
                (pumped, status)
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Race::Cancelled,
                _ = tokio::time::sleep(task.timeout()) => Race::TimedOut,
                (pumped, status) = exited => Race::Exited(pumped, status),
            }
        };

        let pid = self.pid;
        match race {
            Race::Cancelled => {
                let killed = self.kill_logged(task, "cancelled").await;
                tracing::warn!(pid, task = %task.command(), killed, "[cancel ]");
                RunOutcome::Cancelled { killed }
            }
            Race::TimedOut => {
                let timeout_secs = task.timeout().as_secs();
                tracing::warn!(pid, task = %task.command(), timeout_secs, "[timeout]");
                let killed = self.kill_logged(task, "timeout").await;
                RunOutcome::TimedOut { killed }
            }
            Race::Exited(pumped, status) => {
                let result = match status {
                    Err(e) => Err(Error::Wait(e)),
                    Ok(status) if !status.success() => Err(Error::Exited(status)),
                    Ok(_) => pumped,
                };
                match result {
                    Ok(()) => {
                        tracing::info!(pid, task = %task.command(), "[success]");
                        RunOutcome::Succeeded
                    }
                    Err(err) => {
                        tracing::error!(pid, task = %task.command(), error = %err, "[failed ]");
                        RunOutcome::Failed(err)
                    }
                }
            }
        }
    }

    /// Best-effort kill. Failures are logged, never escalated.
    async fn kill_logged(&mut self, task: &TaskDescriptor, reason: &str) -> bool {
        match self.kill().await {
            Ok(()) => {
                tracing::info!(pid = self.pid, task = %task.command(), reason, "process killed");
                true
            }
            Err(e) => {
                tracing::error!(pid = self.pid, task = %task.command(), reason, error = %e, "failed to kill process");
                false
            }
        }
    }

    /// Kill the run's process group, then reap the child.
    async fn kill(&mut self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            // Group 0 would address our own process group.
            if self.pid == 0 {
                return self.child.kill().await;
            }
            // SAFETY: killpg only sends a signal. The group id is the child's pid
            // because it was spawned with `process_group(0)`, and the group
            // cannot be recycled while the unreaped leader is still in it.
            let rc = unsafe { libc::killpg(self.pid as libc::pid_t, libc::SIGKILL) };
            if rc != 0 {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() != Some(libc::ESRCH) {
                    tracing::debug!(pid = self.pid, error = %err, "killpg failed, killing child only");
                    return self.child.kill().await;
                }
            }
            self.child.wait().await.map(|_| ())
        }

        #[cfg(not(unix))]
        {
            self.child.kill().await
        }
    }
}

/// Copy stdout and stderr into `sink` as chunks arrive, until both reach EOF.
async fn pump(
    mut stdout: Option<ChildStdout>,
    mut stderr: Option<ChildStderr>,
    sink: &mut OutputSink,
) -> Result<()> {
    let mut out_buf = vec![0u8; PUMP_CHUNK];
    let mut err_buf = vec![0u8; PUMP_CHUNK];

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_chunk(&mut stdout, &mut out_buf) => match read {
                Ok(0) => stdout = None,
                Ok(n) => sink.write_all(&out_buf[..n]).await?,
                Err(source) => return Err(Error::Output { destination: "stdout pipe".to_string(), source }),
            },
            read = read_chunk(&mut stderr, &mut err_buf) => match read {
                Ok(0) => stderr = None,
                Ok(n) => sink.write_all(&err_buf[..n]).await?,
                Err(source) => return Err(Error::Output { destination: "stderr pipe".to_string(), source }),
            },
        }
    }

    Ok(())
}

/// Read from a pipe that may already be closed; a closed pipe never resolves.
async fn read_chunk<R: AsyncRead + Unpin>(pipe: &mut Option<R>, buf: &mut [u8]) -> std::io::Result<usize> {
    match pipe {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}
