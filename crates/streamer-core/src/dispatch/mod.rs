//! Task dispatch.
//!
//! Turns a batch source into task descriptors and feeds them through the
//! bounded queue of a [`WorkerPool`]. Single-task mode bypasses the queue and
//! calls the runner directly.
//!
//! Failure policy:
//! - a source that cannot be read or parsed aborts the batch before any task starts
//! - a record that cannot be decoded is logged and skipped

mod format;

pub use format::{BatchFormat, DecodedRecord};

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::execute::{CancelHandle, PoolSummary, RunOutcome, TaskSender, WorkerPool};
use crate::task::TaskDescriptor;

/// A batch file and its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSource {
    path: PathBuf,
    format: BatchFormat,
}

impl BatchSource {
    /// Describe a batch file. Without an explicit format it is inferred
    /// from the file extension.
    pub fn new(path: impl Into<PathBuf>, format: Option<BatchFormat>) -> Self {
        let path = path.into();
        let format = format.unwrap_or_else(|| BatchFormat::from_path(&path));
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> BatchFormat {
        self.format
    }

    /// Read and decode the whole source.
    pub async fn load(&self) -> Result<Vec<DecodedRecord>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| Error::SourceUnreadable {
                path: self.path.clone(),
                source,
            })?;

        self.format
            .decode(&bytes)
            .map_err(|message| Error::malformed(&self.path, message))
    }
}

/// Result of one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// Records queued for execution.
    pub loaded: usize,
    /// Records rejected while decoding.
    pub skipped: usize,
    /// Outcomes of the queued records.
    pub summary: PoolSummary,
}

/// Feeds descriptors from a source into a worker pool.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pool: WorkerPool,
}

impl Dispatcher {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    /// Run one task directly, without the queue.
    pub async fn run_single(&self, task: &TaskDescriptor, cancel: &CancelHandle) -> RunOutcome {
        self.pool.runner().run(task, cancel).await
    }

    /// Load `source`, then run every valid record through the pool.
    ///
    /// Returns an error only when the source itself is unusable, in which
    /// case no task has been started.
    pub async fn run_batch(&self, source: &BatchSource, cancel: &CancelHandle) -> Result<BatchReport> {
        let records = source.load().await?;
        tracing::debug!(
            path = %source.path().display(),
            format = %source.format(),
            records = records.len(),
            "tasks source decoded"
        );

        let (tx, rx) = self.pool.queue();
        let (summary, (loaded, skipped)) = tokio::join!(self.pool.run(rx, cancel), feed(records, tx));

        Ok(BatchReport {
            loaded,
            skipped,
            summary,
        })
    }
}

/// Push decoded records into the queue, blocking while it is full. The
/// queue is closed when this returns.
///
/// Returns `(loaded, skipped)`.
pub async fn feed(records: Vec<DecodedRecord>, tx: TaskSender) -> (usize, usize) {
    let mut loaded = 0;
    let mut skipped = 0;

    for record in records {
        match record.result {
            Ok(task) => {
                let command = task.command().to_string();
                if tx.send(task).await.is_err() {
                    tracing::error!(record = record.position, task = %command, "task queue closed, no worker left to run the task");
                    skipped += 1;
                    continue;
                }
                tracing::info!(record = record.position, task = %command, "[loaded ]");
                loaded += 1;
            }
            Err(err) => {
                tracing::error!(record = record.position, error = %err, "[failed ] skipping task record");
                skipped += 1;
            }
        }
    }

    tx.close();
    (loaded, skipped)
}
