//! Cancellation and run callbacks.
//!
//! Provides the one-shot cancellation broadcast shared by every in-flight run
//! and the callback hook for progress reporting.

use std::sync::Arc;

use tokio::sync::watch;

use super::RunOutcome;
use crate::task::TaskDescriptor;

/// One-shot cancellation broadcast.
///
/// `CancelHandle` can be cloned and shared across tasks; cancelling any clone
/// is observed by all others, including runs that start afterwards. There is
/// no reset: once cancelled, always cancelled.
///
/// # Example
///
/// ```
/// use streamer_core::execute::CancelHandle;
///
/// let handle = CancelHandle::new();
/// let clone = handle.clone();
///
/// assert!(!handle.is_cancelled());
/// clone.cancel();
/// assert!(handle.is_cancelled());
/// ```
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Create a handle that has not been cancelled.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Broadcast cancellation. Returns `true` only for the call that flipped it.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|cancelled| !std::mem::replace(cancelled, true))
    }

    /// Whether cancellation has been broadcast.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once cancellation has been broadcast. Resolves immediately if
    /// it already was.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback trait for run progress reporting.
pub trait RunCallback: Send + Sync {
    /// Called once the process has been spawned.
    fn on_run_started(&self, task: &TaskDescriptor, pid: u32);

    /// Called with the final outcome of every run that reached the runner.
    fn on_run_finished(&self, task: &TaskDescriptor, outcome: &RunOutcome);
}
