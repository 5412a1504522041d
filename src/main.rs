//! pathwalk - parallel filesystem walker CLI
//!
//! Entry point for the command-line frontend. Walks the given root in
//! parallel, prints admitted entries (as lines or JSON), and optionally
//! dumps the engine statistics.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use humansize::{format_size, BINARY};
use parking_lot::Mutex;
use pathwalk::{EntryInfo, Filter, Walk, WalkError};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Walk a directory tree in parallel with include/exclude filtering
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pathwalk",
    version,
    about = "Walk a directory tree in parallel with include/exclude filtering",
    after_help = "EXAMPLES:\n    \
        pathwalk /var/data\n    \
        pathwalk /var/data -I 'logs/**/archive' -e '*.tmp' -s\n    \
        pathwalk . -d -t\n    \
        pathwalk /srv -J > entries.json"
)]
struct CliArgs {
    /// Path to walk; this path is included in the results
    #[arg(value_name = "ROOT_PATH")]
    root_path: PathBuf,

    /// Maximum number of workers
    #[arg(short = 'j', long = "concurrency", value_name = "NUM")]
    concurrency: Option<usize>,

    /// Job-queue length hint
    #[arg(short = 'q', long = "queue-length", value_name = "NUM")]
    queue_length: Option<usize>,

    /// Directory-entry batch size
    #[arg(short = 'b', long = "batch-size", value_name = "NUM")]
    batch_size: Option<usize>,

    /// Stall-watchdog timeout in milliseconds
    #[arg(long = "stall-timeout-ms", value_name = "MILLIS")]
    stall_timeout_ms: Option<u64>,

    /// Path patterns to include; use '**' for recursive matching (repeatable)
    #[arg(short = 'I', long = "include-path", value_name = "PATTERN", action = clap::ArgAction::Append)]
    include_paths: Vec<String>,

    /// Path patterns to exclude; use '**' for recursive matching (repeatable)
    #[arg(short = 'E', long = "exclude-path", value_name = "PATTERN", action = clap::ArgAction::Append)]
    exclude_paths: Vec<String>,

    /// Filename patterns to include (repeatable)
    #[arg(short = 'i', long = "include-filename", value_name = "PATTERN", action = clap::ArgAction::Append)]
    include_filenames: Vec<String>,

    /// Filename patterns to exclude (repeatable)
    #[arg(short = 'e', long = "exclude-filename", value_name = "PATTERN", action = clap::ArgAction::Append)]
    exclude_filenames: Vec<String>,

    /// Use case-insensitive pattern matching
    #[arg(short = 'c', long = "case-insensitive")]
    case_insensitive: bool,

    /// Only print files
    #[arg(short = 'f', long = "just-files", conflicts_with = "just_directories")]
    just_files: bool,

    /// Only print directories
    #[arg(short = 'd', long = "just-directories")]
    just_directories: bool,

    /// Print entries as a JSON array
    #[arg(short = 'J', long = "json")]
    json: bool,

    /// Prefix lines with entry types ('d'/'f'); ignored with --json
    #[arg(short = 't', long = "type")]
    print_types: bool,

    /// Print statistics after the walk; ignored with --json
    #[arg(short = 's', long = "stats")]
    print_stats: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

/// One entry in the `--json` output.
#[derive(Serialize)]
struct JsonEntry {
    path: String,
    is_directory: bool,
    size: u64,
    modified_time: Option<String>,
    mode: u32,
}

/// Shared sink the visitor writes into from many worker threads at once.
struct Output {
    args: CliArgs,
    root_path: PathBuf,
    sink: Mutex<OutputState>,
}

#[derive(Default)]
struct OutputState {
    collected: Vec<JsonEntry>,
    total_bytes: u64,
}

impl Output {
    fn new(args: CliArgs) -> Self {
        let root_path = args.root_path.clone();
        Self {
            args,
            root_path,
            sink: Mutex::new(OutputState::default()),
        }
    }

    fn visit(&self, parent_path: &Path, info: &EntryInfo) -> Result<(), WalkError> {
        if (self.args.just_directories && !info.is_dir())
            || (self.args.just_files && info.is_dir())
        {
            return Ok(());
        }

        let full_path = parent_path.join(info.name());

        // The root entry itself is visited but not printed.
        let Ok(relative) = full_path.strip_prefix(&self.root_path) else {
            return Ok(());
        };
        if relative.as_os_str().is_empty() {
            return Ok(());
        }

        let mut sink = self.sink.lock();
        if !info.is_dir() {
            sink.total_bytes += info.size();
        }

        if self.args.json {
            sink.collected.push(JsonEntry {
                path: relative.display().to_string(),
                is_directory: info.is_dir(),
                size: info.size(),
                modified_time: info
                    .modified()
                    .map(|modified| DateTime::<Utc>::from(modified).to_rfc3339()),
                mode: info.mode(),
            });

            return Ok(());
        }

        let mut stdout = std::io::stdout().lock();
        if self.args.print_types {
            let type_initial = if info.is_dir() { "d" } else { "f" };
            write!(stdout, "{type_initial} ").map_err(WalkError::visitor)?;
        }

        writeln!(stdout, "{}", relative.display()).map_err(WalkError::visitor)?;

        Ok(())
    }

    fn finish(&self, walk: &Walk) -> Result<()> {
        let sink = self.sink.lock();

        if self.args.json {
            serde_json::to_writer_pretty(std::io::stdout().lock(), &sink.collected)
                .context("failed to render JSON output")?;
            println!();
        } else if self.args.print_stats {
            let stats = walk.stats();
            eprintln!();
            eprint!("{stats}");
            eprintln!("total file size: {}", format_size(sink.total_bytes, BINARY));
        }

        Ok(())
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose);

    let output = Arc::new(Output::new(args.clone()));

    let visitor = {
        let output = Arc::clone(&output);
        move |parent_path: &Path, info: &EntryInfo| output.visit(parent_path, info)
    };

    let mut walk = Walk::new(args.root_path.clone(), visitor);

    if let Some(concurrency) = args.concurrency {
        walk.set_concurrency(concurrency)
            .context("invalid concurrency")?;
    }

    if let Some(queue_length) = args.queue_length {
        walk.set_buffer_size(queue_length);
    }

    if let Some(batch_size) = args.batch_size {
        walk.set_batch_size(batch_size)
            .context("invalid batch size")?;
    }

    if let Some(millis) = args.stall_timeout_ms {
        walk.set_stall_timeout(Duration::from_millis(millis));
    }

    walk.set_filter(Filter {
        include_paths: args.include_paths.clone(),
        exclude_paths: args.exclude_paths.clone(),
        include_filenames: args.include_filenames.clone(),
        exclude_filenames: args.exclude_filenames.clone(),
        case_insensitive: args.case_insensitive,
    })
    .context("invalid filter")?;

    walk.run().context("walk failed")?;

    output.finish(&walk)
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("pathwalk=debug")
    } else {
        EnvFilter::new("pathwalk=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
