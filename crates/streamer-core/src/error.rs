//! Error types for streamer-core.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Result type for streamer-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, running or dispatching tasks.
#[derive(Debug, Error)]
pub enum Error {
    /// The shell process could not be spawned.
    #[error("failed to start task: {0}")]
    Spawn(#[source] std::io::Error),

    /// A file destination could not be opened for appending.
    #[error("failed to create or open destination file [{}]: {source}", path.display())]
    OpenDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process ran to completion with a non-success status.
    #[error("task exited with {0}")]
    Exited(ExitStatus),

    /// Waiting on the process failed.
    #[error("failed to wait for task: {0}")]
    Wait(#[source] std::io::Error),

    /// Copying process output into a destination failed.
    #[error("output error on {destination}: {source}")]
    Output {
        destination: String,
        #[source]
        source: std::io::Error,
    },

    /// A batch record decoded but does not describe a runnable task.
    #[error("invalid task record: {0}")]
    InvalidRecord(String),

    /// A single batch record could not be decoded.
    #[error("cannot decode task record: {0}")]
    Decode(String),

    /// The batch source itself could not be read.
    #[error("cannot read tasks source [{}]: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The batch source was read but is not a valid document.
    #[error("cannot parse tasks source [{}]: {message}", path.display())]
    SourceMalformed { path: PathBuf, message: String },

    /// Registering a termination signal handler failed.
    #[error("cannot install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

impl Error {
    /// Attach a batch source path to a document-level parse failure.
    pub(crate) fn malformed(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::SourceMalformed {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
