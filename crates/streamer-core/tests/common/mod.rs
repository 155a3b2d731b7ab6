//! Shared helpers for streamer-core integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use streamer_core::{EngineConfig, RunCallback, RunOutcome, ShellCommand, TaskDescriptor};

/// Engine configuration pinned to `/bin/sh` and a temporary dated directory.
pub fn config(dated_dir: &Path, workers: usize) -> EngineConfig {
    EngineConfig::from_env()
        .with_shell(ShellCommand::posix("/bin/sh"))
        .with_workers(workers)
        .with_dated_dir(dated_dir)
}

/// Records pids and tracks how many processes run at the same time.
#[derive(Default)]
pub struct Recorder {
    active: AtomicUsize,
    peak: AtomicUsize,
    finished: AtomicUsize,
    pids: Mutex<Vec<u32>>,
}

impl Recorder {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn pids(&self) -> Vec<u32> {
        self.pids.lock().unwrap().clone()
    }
}

impl RunCallback for Recorder {
    fn on_run_started(&self, _task: &TaskDescriptor, pid: u32) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.pids.lock().unwrap().push(pid);
    }

    fn on_run_finished(&self, _task: &TaskDescriptor, outcome: &RunOutcome) {
        let was_running = matches!(
            outcome,
            RunOutcome::Succeeded
                | RunOutcome::Failed(_)
                | RunOutcome::TimedOut { .. }
                | RunOutcome::Cancelled { .. }
        );
        if was_running {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// Whether a process with `pid` still exists.
#[cfg(unix)]
pub fn process_exists(pid: u32) -> bool {
    // SAFETY: signal 0 performs only the existence and permission check.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}
