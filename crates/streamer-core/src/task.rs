//! Task descriptors and the batch record schema they are decoded from.
//!
//! A [`TaskDescriptor`] is immutable once built: it is constructed from CLI
//! flags or a decoded [`TaskRecord`], consumed by exactly one run and then
//! dropped.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Timeout applied when a task asks for zero or a negative number of seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// One place a task's combined output is copied to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// The process's own standard output.
    Terminal,
    /// `outputs-<YYYY><MM><DD>.txt`, named from the local date at sink build time.
    DatedFile,
    /// An explicitly named file, opened append-create.
    File(PathBuf),
}

/// Immutable description of one command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    command: String,
    timeout: Duration,
    destinations: Vec<Destination>,
}

impl TaskDescriptor {
    /// Build a descriptor.
    ///
    /// `timeout_secs <= 0` is normalized to [`DEFAULT_TIMEOUT_SECS`]. Duplicate
    /// destinations are collapsed, keeping the first occurrence.
    pub fn new(
        command: impl Into<String>,
        timeout_secs: i64,
        destinations: impl IntoIterator<Item = Destination>,
    ) -> Self {
        let mut unique: Vec<Destination> = Vec::new();
        for destination in destinations {
            if !unique.contains(&destination) {
                unique.push(destination);
            }
        }

        Self {
            command: command.into(),
            timeout: Duration::from_secs(normalize_timeout(timeout_secs)),
            destinations: unique,
        }
    }

    /// Build a descriptor from the single-task flag set.
    ///
    /// `files` is the whitespace separated list given on the command line.
    pub fn from_flags(command: &str, timeout_secs: i64, files: &str, save: bool, console: bool) -> Self {
        let mut destinations = Vec::new();
        if console {
            destinations.push(Destination::Terminal);
        }
        if save {
            destinations.push(Destination::DatedFile);
        }
        destinations.extend(files.split_whitespace().map(|f| Destination::File(f.into())));
        Self::new(command, timeout_secs, destinations)
    }

    /// The shell command line, handed verbatim to the shell.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Effective execution deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Destinations as declared. May be empty; the sink substitutes the terminal.
    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }
}

fn normalize_timeout(timeout_secs: i64) -> u64 {
    if timeout_secs <= 0 {
        DEFAULT_TIMEOUT_SECS
    } else {
        timeout_secs as u64
    }
}

/// One task record as found in a batch source, in any encoding.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskRecord {
    pub task: String,
    #[serde(default)]
    pub timeout: i64,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub save: bool,
    #[serde(default)]
    pub console: bool,
}

impl TryFrom<TaskRecord> for TaskDescriptor {
    type Error = Error;

    fn try_from(record: TaskRecord) -> Result<Self> {
        if record.task.trim().is_empty() {
            return Err(Error::InvalidRecord("empty task command".to_string()));
        }

        let mut destinations = Vec::new();
        if record.console {
            destinations.push(Destination::Terminal);
        }
        if record.save {
            destinations.push(Destination::DatedFile);
        }
        destinations.extend(record.files.into_iter().map(|f| Destination::File(f.into())));

        Ok(Self::new(record.task, record.timeout, destinations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_timeout_is_normalized() {
        for secs in [0, -1, -3600, i64::MIN] {
            let task = TaskDescriptor::new("true", secs, []);
            assert_eq!(task.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        }
    }

    #[test]
    fn test_positive_timeout_is_kept() {
        let task = TaskDescriptor::new("true", 42, []);
        assert_eq!(task.timeout(), Duration::from_secs(42));
    }

    #[test]
    fn test_from_flags_splits_files() {
        let task = TaskDescriptor::from_flags("ls", 10, "  a.txt   b.txt ", true, true);
        assert_eq!(
            task.destinations(),
            &[
                Destination::Terminal,
                Destination::DatedFile,
                Destination::File("a.txt".into()),
                Destination::File("b.txt".into()),
            ]
        );
    }

    #[test]
    fn test_from_flags_without_destinations() {
        let task = TaskDescriptor::from_flags("ls", 10, "", false, false);
        assert!(task.destinations().is_empty());
    }

    #[test]
    fn test_duplicate_destinations_collapse() {
        let task = TaskDescriptor::from_flags("ls", 10, "a.txt a.txt", false, false);
        assert_eq!(task.destinations(), &[Destination::File("a.txt".into())]);
    }

    #[test]
    fn test_record_conversion() {
        let record = TaskRecord {
            task: "echo hi".to_string(),
            timeout: 5,
            files: vec!["x.log".to_string()],
            save: false,
            console: true,
        };
        let task = TaskDescriptor::try_from(record).unwrap();
        assert_eq!(task.command(), "echo hi");
        assert_eq!(task.timeout(), Duration::from_secs(5));
        assert_eq!(
            task.destinations(),
            &[Destination::Terminal, Destination::File("x.log".into())]
        );
    }

    #[test]
    fn test_record_with_empty_task_is_rejected() {
        let record = TaskRecord {
            task: "   ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            TaskDescriptor::try_from(record),
            Err(Error::InvalidRecord(_))
        ));
    }
}
