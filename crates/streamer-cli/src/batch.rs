//! Batch mode: every record of a tasks file runs through the worker pool.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use streamer_core::{BatchFormat, BatchSource, CancelHandle, Dispatcher};

/// Load `path` and run its tasks.
///
/// Only an unusable source is an error; individual task outcomes are
/// reported in the summary line.
pub async fn execute(
    dispatcher: &Dispatcher,
    path: &Path,
    format: Option<BatchFormat>,
    cancel: &CancelHandle,
) -> anyhow::Result<()> {
    let source = BatchSource::new(path, format);
    let start = Instant::now();

    let report = dispatcher
        .run_batch(&source, cancel)
        .await
        .with_context(|| format!("cannot run tasks from {}", path.display()))?;

    let summary = report.summary;
    tracing::info!(
        loaded = report.loaded,
        skipped_records = report.skipped,
        succeeded = summary.succeeded,
        failed = summary.failed,
        timed_out = summary.timed_out,
        cancelled = summary.cancelled,
        start_failed = summary.start_failed,
        sink_build_failed = summary.sink_build_failed,
        not_started = summary.skipped,
        elapsed_secs = start.elapsed().as_secs_f64(),
        "batch completed"
    );

    Ok(())
}
