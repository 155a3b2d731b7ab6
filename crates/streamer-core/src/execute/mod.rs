//! Execution engine for cli-streamer tasks.
//!
//! # Architecture
//!
//! ```text
//! TaskDescriptor
//!     │
//!     ├── OutputSink::build (terminal / dated file / named files)
//!     │
//!     └── ProcessRunner::execute
//!             │
//!             ├── spawn `<shell> -c <command>` (own process group)
//!             ├── pump stdout + stderr → sink
//!             └── select { cancel, deadline, exit }
//!                     └── kill on cancel / deadline
//! ```
//!
//! `WorkerPool` runs many descriptors through a bounded queue with a fixed
//! number of workers, each executing its tasks strictly one after another.
//!
//! # Module Structure
//!
//! - `context` - Cancellation broadcast and run callbacks
//! - `runner` - ProcessRunner for a single supervised run
//! - `pool` - WorkerPool for bounded concurrent execution

mod context;
mod pool;
mod runner;

pub use context::{CancelHandle, RunCallback};
pub use pool::{PoolSummary, TaskQueue, TaskSender, WorkerPool};
pub use runner::ProcessRunner;

use crate::error::Error;

/// Terminal state of one task.
#[derive(Debug)]
pub enum RunOutcome {
    /// The process exited with a success status.
    Succeeded,
    /// The process exited unsuccessfully, waiting on it failed, or its output
    /// could not be copied.
    Failed(Error),
    /// The deadline fired first. `killed` tells whether the kill went through.
    TimedOut { killed: bool },
    /// Cancellation was broadcast while the process ran.
    Cancelled { killed: bool },
    /// The shell could not be spawned.
    StartFailed(Error),
    /// A destination could not be opened; the process was never started.
    SinkBuildFailed(Error),
    /// Dequeued after cancellation and deliberately not started.
    Skipped,
}

impl RunOutcome {
    /// Whether the run succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Short lowercase name, used in logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::TimedOut { .. } => "timed_out",
            Self::Cancelled { .. } => "cancelled",
            Self::StartFailed(_) => "start_failed",
            Self::SinkBuildFailed(_) => "sink_build_failed",
            Self::Skipped => "skipped",
        }
    }
}
