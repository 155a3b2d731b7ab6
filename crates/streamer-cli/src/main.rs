//! cli-streamer - run shell commands under a deadline and stream their output
//! to the terminal and any number of files.

mod batch;
mod single;

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use streamer_core::{
    BatchFormat, CancelHandle, DEFAULT_TIMEOUT_SECS, Dispatcher, EngineConfig, ShellCommand,
    SignalBridge, WorkerPool,
};

const USAGE_EXAMPLES: &str = "\
Examples:
  cli-streamer --task \"ping 127.0.0.1 -c 5\" --timeout 10 --console
  cli-streamer --task \"netstat -n\" --files \"net1.txt net2.txt\" --save
  cli-streamer --tasks-file tasks.json --workers 4
  cli-streamer --tasks-file tasks.conf --format toml

Batch sources hold records of the form
  {task: string, timeout: integer, files: [string], save: bool, console: bool}
as one JSON object per line, or under a top-level `tasks` array in a JSON,
TOML or YAML document.";

#[derive(Parser)]
#[command(name = "cli-streamer")]
#[command(about = "Execute shell commands with a timeout and stream their output to multiple destinations")]
#[command(version)]
#[command(after_help = USAGE_EXAMPLES)]
struct Cli {
    /// Full command with its arguments to be executed
    #[arg(long, conflicts_with = "tasks_file")]
    task: Option<String>,

    /// Execution timeout in seconds (zero or negative means one hour)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS as i64, allow_negative_numbers = true)]
    timeout: i64,

    /// Whitespace separated file names to stream the output to
    #[arg(long, default_value = "")]
    files: String,

    /// Also stream the output to the daily file outputs-YYYYMMDD.txt
    #[arg(long)]
    save: bool,

    /// Also stream the output to the console
    #[arg(long)]
    console: bool,

    /// Batch source with one task record per entry
    #[arg(long, value_name = "PATH")]
    tasks_file: Option<PathBuf>,

    /// Encoding of the batch source: lines, json, toml or yaml [default: by extension]
    #[arg(long, requires = "tasks_file")]
    format: Option<BatchFormat>,

    /// Number of concurrent workers in batch mode [default: 2 x CPUs - 1]
    #[arg(long)]
    workers: Option<usize>,

    /// Shell program used to interpret commands (invoked as `<shell> -c <task>`)
    #[arg(long, value_name = "PATH")]
    shell: Option<PathBuf>,

    /// Directory of the daily output file
    #[arg(long, value_name = "DIR")]
    dated_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::from_env();
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(ref shell) = self.shell {
            config = config.with_shell(ShellCommand::posix(shell.as_os_str()));
        }
        if let Some(ref dir) = self.dated_dir {
            config = config.with_dated_dir(dir);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries task output only.
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // A blank command counts as no command at all.
    let task = cli.task.as_deref().filter(|t| !t.trim().is_empty());
    if task.is_none() && cli.tasks_file.is_none() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let config = cli.engine_config();
    tracing::debug!(?config, "engine configured");

    let cancel = CancelHandle::new();
    let bridge = SignalBridge::install()?.spawn(cancel.clone());
    let dispatcher = Dispatcher::new(WorkerPool::from_config(&config));

    let result = match (task, &cli.tasks_file) {
        (Some(task), _) => {
            single::execute(&dispatcher, task, cli.timeout, &cli.files, cli.save, cli.console, &cancel)
                .await;
            Ok(())
        }
        (None, Some(path)) => batch::execute(&dispatcher, path, cli.format, &cancel).await,
        (None, None) => Ok(()),
    };

    bridge.abort();
    result
}
