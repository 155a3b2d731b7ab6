//! Single task mode.
//!
//! The task runs directly on the calling future without going through the
//! worker queue.

use std::time::Instant;

use streamer_core::{CancelHandle, Dispatcher, RunOutcome, TaskDescriptor};

/// Build the descriptor from the command line flags and run it.
///
/// Task failures are logged by the engine and never turn into an error here.
pub async fn execute(
    dispatcher: &Dispatcher,
    command: &str,
    timeout_secs: i64,
    files: &str,
    save: bool,
    console: bool,
    cancel: &CancelHandle,
) -> RunOutcome {
    let task = TaskDescriptor::from_flags(command, timeout_secs, files, save, console);
    tracing::debug!(
        task = %task.command(),
        timeout_secs = task.timeout().as_secs(),
        destinations = task.destinations().len(),
        "single task"
    );

    let start = Instant::now();
    let outcome = dispatcher.run_single(&task, cancel).await;
    tracing::debug!(
        outcome = outcome.kind(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "single task finished"
    );
    outcome
}
