//! Bounded worker pool.
//!
//! A fixed set of workers pulls descriptors from one shared bounded queue.
//! Each worker runs its tasks strictly one after another, so at most
//! `workers` processes are alive at any time. The producer closes the queue
//! by dropping its sender; the pool completes once every worker has drained.

use tokio::task::JoinSet;

use super::context::CancelHandle;
use super::runner::ProcessRunner;
use super::RunOutcome;
use crate::config::EngineConfig;
use crate::task::TaskDescriptor;

/// Producer side of the task queue.
pub type TaskSender = async_channel::Sender<TaskDescriptor>;

/// Consumer side of the task queue, shared by all workers.
pub type TaskQueue = async_channel::Receiver<TaskDescriptor>;

/// Outcome counts for a pool run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
    pub start_failed: usize,
    pub sink_build_failed: usize,
    pub skipped: usize,
}

impl PoolSummary {
    /// Count one outcome.
    pub fn record(&mut self, outcome: &RunOutcome) {
        let slot = match outcome {
            RunOutcome::Succeeded => &mut self.succeeded,
            RunOutcome::Failed(_) => &mut self.failed,
            RunOutcome::TimedOut { .. } => &mut self.timed_out,
            RunOutcome::Cancelled { .. } => &mut self.cancelled,
            RunOutcome::StartFailed(_) => &mut self.start_failed,
            RunOutcome::SinkBuildFailed(_) => &mut self.sink_build_failed,
            RunOutcome::Skipped => &mut self.skipped,
        };
        *slot += 1;
    }

    /// Add another summary's counts into this one.
    pub fn merge(&mut self, other: PoolSummary) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.timed_out += other.timed_out;
        self.cancelled += other.cancelled;
        self.start_failed += other.start_failed;
        self.sink_build_failed += other.sink_build_failed;
        self.skipped += other.skipped;
    }

    /// Number of descriptors that reached a terminal outcome.
    pub fn total(&self) -> usize {
        self.succeeded
            + self.failed
            + self.timed_out
            + self.cancelled
            + self.start_failed
            + self.sink_build_failed
            + self.skipped
    }
}

/// Fixed-size pool of task workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    runner: ProcessRunner,
}

impl WorkerPool {
    /// Create a pool of `workers` (at least one) sharing `runner`.
    pub fn new(workers: usize, runner: ProcessRunner) -> Self {
        Self {
            workers: workers.max(1),
            runner,
        }
    }

    /// Create a pool sized and configured from `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.workers, ProcessRunner::new(config))
    }

    /// Number of workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// The runner every worker executes tasks with.
    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    /// Create a task queue whose capacity equals the worker count.
    pub fn queue(&self) -> (TaskSender, TaskQueue) {
        async_channel::bounded(self.workers)
    }

    /// Run workers until `queue` is closed and drained.
    ///
    /// Descriptors dequeued after cancellation are skipped, not started.
    pub async fn run(&self, queue: TaskQueue, cancel: &CancelHandle) -> PoolSummary {
        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            workers.spawn(worker_loop(
                id,
                self.runner.clone(),
                queue.clone(),
                cancel.clone(),
            ));
        }
        drop(queue);

        tracing::debug!(workers = self.workers, "worker pool started");

        let mut summary = PoolSummary::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_summary) => summary.merge(worker_summary),
                Err(e) => tracing::error!(error = %e, "worker terminated abnormally"),
            }
        }
        summary
    }
}

async fn worker_loop(
    id: usize,
    runner: ProcessRunner,
    queue: TaskQueue,
    cancel: CancelHandle,
) -> PoolSummary {
    let mut summary = PoolSummary::default();

    while let Ok(task) = queue.recv().await {
        let outcome = if cancel.is_cancelled() {
            tracing::warn!(worker = id, task = %task.command(), "[skipped] cancellation already requested");
            RunOutcome::Skipped
        } else {
            runner.run(&task, &cancel).await
        };
        summary.record(&outcome);
    }

    tracing::debug!(worker = id, "queue drained");
    summary
}
