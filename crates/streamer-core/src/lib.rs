//! Task execution engine for cli-streamer.
//!
//! This crate provides:
//! - Immutable task descriptors and the batch record schema
//! - Fan-out output sinks (terminal, dated file, named files)
//! - Supervised shell runs racing exit, deadline and cancellation
//! - A bounded worker pool fed through a shared queue
//! - Batch decoding for line-JSON, JSON, TOML and YAML sources
//! - Termination signal to cancellation bridging

pub mod config;
pub mod dispatch;
pub mod error;
pub mod execute;
pub mod signal;
pub mod sink;
pub mod task;

pub use config::{EngineConfig, ShellCommand, default_worker_count};
pub use dispatch::{BatchFormat, BatchReport, BatchSource, DecodedRecord, Dispatcher};
pub use error::{Error, Result};
pub use execute::{
    CancelHandle, PoolSummary, ProcessRunner, RunCallback, RunOutcome, TaskQueue, TaskSender,
    WorkerPool,
};
pub use signal::SignalBridge;
pub use sink::{OutputSink, ResolvedDestination};
pub use task::{DEFAULT_TIMEOUT_SECS, Destination, TaskDescriptor, TaskRecord};
