//! End-to-end tests for the cli-streamer binary.
//!
//! These drive the built binary against real shell commands and check what
//! lands on stdout and in the destination files.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin for tests
#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn streamer(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cli-streamer").unwrap();
    cmd.current_dir(workdir)
        .env("SHELL", "/bin/sh")
        .env_remove("RUST_LOG")
        .timeout(Duration::from_secs(30));
    cmd
}

fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).expect("Failed to read output file")
}

// =============================================================================
// Help and Version
// =============================================================================

#[test]
fn test_no_arguments_prints_help() {
    let temp = TempDir::new().unwrap();
    streamer(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("--task"))
        .stdout(predicate::str::contains("--tasks-file"))
        .stdout(predicate::str::contains("Examples:"));
}

#[test]
fn test_blank_task_prints_help() {
    let temp = TempDir::new().unwrap();
    for blank in ["", "   "] {
        streamer(temp.path())
            .args(["--task", blank])
            .assert()
            .success()
            .stdout(predicate::str::contains("Examples:"))
            .stderr(predicate::str::contains("[started]").not());
    }
}

#[test]
fn test_version() {
    let temp = TempDir::new().unwrap();
    streamer(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cli-streamer"));
}

#[test]
fn test_unknown_format_is_rejected() {
    let temp = TempDir::new().unwrap();
    streamer(temp.path())
        .args(["--tasks-file", "tasks.txt", "--format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown tasks format"));
}

// =============================================================================
// Single Task
// =============================================================================

#[test]
fn test_console_output_on_stdout_logs_on_stderr() {
    let temp = TempDir::new().unwrap();
    streamer(temp.path())
        .args(["--task", "echo hello; echo oops 1>&2", "--console"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"))
        .stdout(predicate::str::contains("oops"))
        .stderr(predicate::str::contains("[started]"))
        .stderr(predicate::str::contains("[success]"));
}

#[test]
fn test_no_destination_defaults_to_console() {
    let temp = TempDir::new().unwrap();
    streamer(temp.path())
        .args(["--task", "echo fallback"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fallback"));
}

#[test]
fn test_files_and_dated_file() {
    let temp = TempDir::new().unwrap();
    streamer(temp.path())
        .args(["--task", "echo stored", "--files", "one.txt two.txt", "--save"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stored").not());

    assert_eq!(read(temp.path().join("one.txt")), "stored\n");
    assert_eq!(read(temp.path().join("two.txt")), "stored\n");

    let dated: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("outputs-") && name.ends_with(".txt"))
        .collect();
    assert_eq!(dated.len(), 1, "dated files: {dated:?}");
    assert_eq!(dated[0].len(), "outputs-YYYYMMDD.txt".len());
    assert_eq!(read(temp.path().join(&dated[0])), "stored\n");
}

#[test]
fn test_files_are_appended() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("log.txt"), "before\n").unwrap();

    streamer(temp.path())
        .args(["--task", "echo after", "--files", "log.txt"])
        .assert()
        .success();

    assert_eq!(read(temp.path().join("log.txt")), "before\nafter\n");
}

#[test]
fn test_dated_dir_flag() {
    let temp = TempDir::new().unwrap();
    let dated_dir = temp.path().join("daily");
    fs::create_dir(&dated_dir).unwrap();

    streamer(temp.path())
        .args(["--task", "echo daily", "--save", "--dated-dir"])
        .arg(&dated_dir)
        .assert()
        .success();

    let entries = fs::read_dir(&dated_dir).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn test_timeout_kills_and_exits_zero() {
    let temp = TempDir::new().unwrap();
    let start = Instant::now();

    streamer(temp.path())
        .args(["--task", "echo begin; sleep 30; echo end", "--timeout", "1", "--console"])
        .assert()
        .success()
        .stdout(predicate::str::contains("begin"))
        .stdout(predicate::str::contains("end").not())
        .stderr(predicate::str::contains("[timeout]"));

    assert!(start.elapsed() < Duration::from_secs(15));
}

#[test]
fn test_failing_task_still_exits_zero() {
    let temp = TempDir::new().unwrap();
    streamer(temp.path())
        .args(["--task", "exit 9"])
        .assert()
        .success()
        .stderr(predicate::str::contains("[failed ]"));
}

#[test]
fn test_unopenable_file_is_reported() {
    let temp = TempDir::new().unwrap();
    streamer(temp.path())
        .args(["--task", "echo x", "--files", "missing/out.txt"])
        .assert()
        .success()
        .stderr(predicate::str::contains("missing/out.txt"));
}

// =============================================================================
// Batch
// =============================================================================

#[test]
fn test_batch_lines_with_bad_record() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("tasks.txt"),
        "{\"task\": \"echo a\", \"files\": [\"out.txt\"]}\n\
         not json\n\
         {\"task\": \"echo b\", \"files\": [\"out.txt\"], \"web\": false}\n",
    )
    .unwrap();

    streamer(temp.path())
        .args(["--tasks-file", "tasks.txt", "--workers", "2"])
        .assert()
        .success()
        .stderr(predicate::str::contains("skipping task record"))
        .stderr(predicate::str::contains("batch completed"));

    let mut lines: Vec<_> = read(temp.path().join("out.txt"))
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    assert_eq!(lines, vec!["a", "b"]);
}

#[test]
fn test_batch_json_document() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("tasks.json"),
        r#"{"tasks": [
            {"task": "echo first", "files": ["json.txt"]},
            {"task": "echo second", "files": ["json.txt"], "timeout": 5}
        ]}"#,
    )
    .unwrap();

    streamer(temp.path())
        .args(["--tasks-file", "tasks.json", "--workers", "1"])
        .assert()
        .success();

    assert_eq!(read(temp.path().join("json.txt")), "first\nsecond\n");
}

#[test]
fn test_batch_yaml_and_toml() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("tasks.yaml"),
        "tasks:\n  - task: echo from-yaml\n    files: [yaml.txt]\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("tasks.toml"),
        "[[tasks]]\ntask = \"echo from-toml\"\nfiles = [\"toml.txt\"]\n",
    )
    .unwrap();

    streamer(temp.path())
        .args(["--tasks-file", "tasks.yaml"])
        .assert()
        .success();
    streamer(temp.path())
        .args(["--tasks-file", "tasks.toml"])
        .assert()
        .success();

    assert_eq!(read(temp.path().join("yaml.txt")), "from-yaml\n");
    assert_eq!(read(temp.path().join("toml.txt")), "from-toml\n");
}

#[test]
fn test_missing_tasks_file_fails() {
    let temp = TempDir::new().unwrap();
    streamer(temp.path())
        .args(["--tasks-file", "absent.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.json"));
}

#[test]
fn test_quiet_hides_progress_lines() {
    let temp = TempDir::new().unwrap();
    streamer(temp.path())
        .args(["--task", "echo hushed", "--console", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hushed"))
        .stderr(predicate::str::contains("[started]").not());
}
