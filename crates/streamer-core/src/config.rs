//! Engine configuration.
//!
//! Built once at startup and passed down explicitly; nothing here is mutated
//! after the engine starts.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

/// How a task string is handed to the host shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    /// Interpreter executable.
    pub program: OsString,
    /// Arguments placed before the task string (`-c`, `/C`).
    pub args: Vec<OsString>,
}

impl ShellCommand {
    /// Shell used when `SHELL` is unset on non-Windows hosts.
    pub const DEFAULT_UNIX_SHELL: &'static str = "/bin/sh";

    /// Resolve the platform shell.
    ///
    /// Windows wraps commands in `cmd /C`. Elsewhere `$SHELL -c` is used,
    /// falling back to `/bin/sh -c`.
    pub fn from_env() -> Self {
        if cfg!(windows) {
            return Self {
                program: "cmd".into(),
                args: vec!["/C".into()],
            };
        }

        let program = std::env::var_os("SHELL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_UNIX_SHELL.into());
        Self::posix(program)
    }

    /// `<program> -c <task>`.
    pub fn posix(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: vec!["-c".into()],
        }
    }

    /// Build the command that runs `task` with stdout and stderr piped.
    pub fn command(&self, task: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(task)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Each task leads its own process group so a kill reaches the whole pipeline.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}

/// Number of pool workers for this host: two per logical core, minus one
/// left for the dispatcher, never less than one.
pub fn default_worker_count() -> usize {
    let cores = std::thread::available_parallelism().map_or(1, usize::from);
    (cores * 2).saturating_sub(1).max(1)
}

/// Immutable engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Shell used to interpret task command lines.
    pub shell: ShellCommand,
    /// Worker pool size for batch mode.
    pub workers: usize,
    /// Directory where the dated output file is created.
    pub dated_dir: PathBuf,
}

impl EngineConfig {
    /// Configuration resolved from the host environment.
    pub fn from_env() -> Self {
        Self {
            shell: ShellCommand::from_env(),
            workers: default_worker_count(),
            dated_dir: PathBuf::from("."),
        }
    }

    /// Override the shell program (`<program> -c <task>`).
    pub fn with_shell(mut self, shell: ShellCommand) -> Self {
        self.shell = shell;
        self
    }

    /// Override the worker count. Zero is clamped to one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Override the directory of the dated output file.
    pub fn with_dated_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dated_dir = dir.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
