//! Fan-out output sink.
//!
//! A sink duplicates every chunk of process output to all of a task's
//! destinations. Destinations are realized in a fixed order:
//!
//! ```text
//! terminal   (requested, or substituted when nothing was requested)
//! dated file (<dated_dir>/outputs-YYYYMMDD.txt, append-create)
//! files      (declared order, append-create)
//! ```
//!
//! Opening is fail-fast: if any file cannot be opened the sink is not built
//! and the task never starts.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::task::{Destination, TaskDescriptor};

/// Name of the dated output file for `date`.
pub fn dated_file_name(date: NaiveDate) -> String {
    format!("outputs-{}.txt", date.format("%Y%m%d"))
}

/// A destination after defaulting and date resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedDestination {
    Terminal,
    File(PathBuf),
}

/// Resolve a task's destinations into open order.
///
/// An empty destination set resolves to the terminal alone.
pub fn plan(task: &TaskDescriptor, dated_dir: &Path, today: NaiveDate) -> Vec<ResolvedDestination> {
    let declared = task.destinations();
    let mut resolved = Vec::with_capacity(declared.len().max(1));

    if declared.is_empty() || declared.contains(&Destination::Terminal) {
        resolved.push(ResolvedDestination::Terminal);
    }

    if declared.contains(&Destination::DatedFile) {
        resolved.push(ResolvedDestination::File(dated_dir.join(dated_file_name(today))));
    }

    for destination in declared {
        if let Destination::File(path) = destination {
            resolved.push(ResolvedDestination::File(path.clone()));
        }
    }

    resolved
}

struct SinkTarget {
    label: String,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
}

/// Writer duplicating every byte to all of a task's destinations.
pub struct OutputSink {
    targets: Vec<SinkTarget>,
}

impl OutputSink {
    /// Open all destinations of `task`, naming the dated file from today's local date.
    pub async fn build(task: &TaskDescriptor, dated_dir: &Path) -> Result<Self> {
        let today = Local::now().date_naive();
        Self::open(plan(task, dated_dir, today)).await
    }

    /// Open an already resolved destination list, in order.
    pub async fn open(destinations: Vec<ResolvedDestination>) -> Result<Self> {
        let mut targets = Vec::with_capacity(destinations.len());

        for destination in destinations {
            let target = match destination {
                ResolvedDestination::Terminal => SinkTarget {
                    label: "terminal".to_string(),
                    writer: Box::new(tokio::io::stdout()),
                },
                ResolvedDestination::File(path) => {
                    let file = OpenOptions::new()
                        .append(true)
                        .create(true)
                        .open(&path)
                        .await
                        .map_err(|source| Error::OpenDestination {
                            path: path.clone(),
                            source,
                        })?;
                    SinkTarget {
                        label: path.display().to_string(),
                        writer: Box::new(file),
                    }
                }
            };
            targets.push(target);
        }

        Ok(Self { targets })
    }

    /// Labels of the live destinations, in write order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.label.as_str())
    }

    /// Number of live destinations.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the sink has no destinations.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Write `buf` to every destination and flush it through.
    ///
    /// Stops at the first failing destination and reports it by name.
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        for target in &mut self.targets {
            target
                .writer
                .write_all(buf)
                .await
                .map_err(|source| Error::Output {
                    destination: target.label.clone(),
                    source,
                })?;
        }
        self.flush().await
    }

    /// Flush every destination.
    pub async fn flush(&mut self) -> Result<()> {
        for target in &mut self.targets {
            target
                .writer
                .flush()
                .await
                .map_err(|source| Error::Output {
                    destination: target.label.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.labels()).finish()
    }
}
