use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Args, Parser, Subcommand};

use crate::compare::FieldPolicy;
use crate::error::{FvError, FvResult};

// ---------------------------------------------------------------------------
// Graceful Ctrl+C shutdown
// ---------------------------------------------------------------------------

/// Global flag indicating that a shutdown signal has been received.
static SHUTDOWN_FLAG: AtomicBool = AtomicBool::new(false);

/// Coordinates graceful Ctrl+C shutdown.
///
/// When a signal is received the controller sets a global `AtomicBool`, which
/// long-running loops poll via [`ShutdownController::is_shutting_down`]. The
/// run loop stops pulling verdicts and the batch loops stop between files.
///
/// # Example
/// ```rust,no_run
/// use franken_verdict::cli::ShutdownController;
/// ShutdownController::install(None).ok();
/// // … drive the harness …
/// if ShutdownController::is_shutting_down() {
///     eprintln!("interrupted");
/// }
/// ```
pub struct ShutdownController;

impl ShutdownController {
    /// Install the Ctrl+C signal handler.
    ///
    /// `on_signal` is an optional callback invoked from the signal-handler
    /// context. Errors are non-fatal (signal handling is best-effort), so
    /// callers may choose to log and continue.
    pub fn install(on_signal: Option<Box<dyn Fn() + Send + Sync + 'static>>) -> FvResult<()> {
        ctrlc::set_handler(move || {
            SHUTDOWN_FLAG.store(true, Ordering::SeqCst);
            tracing::info!("shutdown signal received (Ctrl+C)");

            if let Some(ref cb) = on_signal {
                cb();
            }
        })
        .map_err(|e| FvError::Io(std::io::Error::other(format!("ctrlc handler: {e}"))))?;
        Ok(())
    }

    /// Returns `true` once a Ctrl+C (or programmatic trigger) has been received.
    #[must_use]
    pub fn is_shutting_down() -> bool {
        SHUTDOWN_FLAG.load(Ordering::SeqCst)
    }

    /// Programmatically trigger the shutdown flag (useful for testing and
    /// internal cancel paths).
    pub fn trigger_shutdown() {
        SHUTDOWN_FLAG.store(true, Ordering::SeqCst);
    }

    /// Reset the shutdown flag (for testing only).
    #[cfg(test)]
    pub fn reset() {
        SHUTDOWN_FLAG.store(false, Ordering::SeqCst);
    }

    /// The exit code the binary should use when exiting due to a signal.
    #[must_use]
    pub const fn signal_exit_code() -> i32 {
        130 // Convention: 128 + SIGINT(2)
    }
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "franken_verdict")]
#[command(about = "Regression harness for metadata-extraction parsers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute stored test cases and report verdicts.
    Run(RunArgs),
    /// Record expected results for new input files (insert-if-absent).
    Add(BatchArgs),
    /// Regenerate expected results, replacing existing entries; with no FILES
    /// it refreshes every stored case for the parser.
    Update(BatchArgs),
    /// Remove stored entries by filename.
    Delete(BatchArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Parser to test (optionally source-qualified, e.g. acme:dropper).
    #[arg(short = 'p', long)]
    pub parser: Option<String>,

    /// Test every parser with stored results.
    #[arg(short = 'a', long, conflicts_with = "parser")]
    pub all: bool,

    /// Only compare these fields (comma-separated; empty means all).
    #[arg(short = 'k', long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Skip these fields during comparison (replaces the default list).
    #[arg(
        short = 'x',
        long,
        value_delimiter = ',',
        default_value = "debug,inputfilename,timestamp"
    )]
    pub exclude: Vec<String>,

    /// Compare these fields as unordered collections.
    #[arg(long, value_delimiter = ',')]
    pub unordered: Vec<String>,

    /// Worker thread count (default: three quarters of logical CPUs).
    #[arg(short = 'n', long)]
    pub workers: Option<usize>,

    /// Directory containing a parsers.json manifest.
    #[arg(long)]
    pub parser_dir: PathBuf,

    /// Store root override; defaults to a parsertests directory next to each
    /// parser.
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// Print the full verdict array as pretty JSON instead of plain output.
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Suppress per-case progress and detail output; keep the summary.
    #[arg(short = 's', long)]
    pub silent: bool,

    /// Show detail blocks only for failing cases.
    #[arg(short = 'f', long)]
    pub failed_only: bool,

    /// Increase log verbosity (repeatable).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl RunArgs {
    /// `Some(name)` for a single parser, `None` for all; requires exactly one
    /// of `--parser` and `--all`.
    pub fn parser_filter(&self) -> FvResult<Option<String>> {
        match (&self.parser, self.all) {
            (Some(parser), false) => Ok(Some(parser.clone())),
            (None, true) => Ok(None),
            (None, false) => Err(FvError::InvalidRequest(
                "specify --parser or --all".to_owned(),
            )),
            (Some(_), true) => Err(FvError::InvalidRequest(
                "--parser and --all are mutually exclusive".to_owned(),
            )),
        }
    }

    #[must_use]
    pub fn policy(&self) -> FieldPolicy {
        FieldPolicy::from_lists(&self.include, &self.exclude, &self.unordered)
    }
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Parser whose stored results are affected (optionally source-qualified).
    #[arg(short = 'p', long)]
    pub parser: String,

    /// Input files to process.
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// File listing one input path per line, or - for standard input.
    #[arg(short = 'i', long)]
    pub input_list: Option<String>,

    /// Directory containing a parsers.json manifest.
    #[arg(long)]
    pub parser_dir: PathBuf,

    /// Store root override.
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// Increase log verbosity (repeatable).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl BatchArgs {
    /// Whether the invocation named any inputs, positionally or via a list.
    #[must_use]
    pub fn has_inputs(&self) -> bool {
        !self.files.is_empty() || self.input_list.is_some()
    }

    /// Positional files first, then the input list in file order.
    pub fn collect_inputs(&self) -> FvResult<Vec<String>> {
        let mut inputs: Vec<String> = self
            .files
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        if let Some(list) = &self.input_list {
            inputs.extend(read_input_list(list)?);
        }
        if inputs.is_empty() {
            return Err(FvError::InvalidRequest(
                "no input files given; pass FILES or --input-list".to_owned(),
            ));
        }
        Ok(inputs)
    }
}

/// Read one input path per line; `-` reads standard input. Trailing
/// whitespace is stripped and blank lines are skipped.
pub fn read_input_list(source: &str) -> FvResult<Vec<String>> {
    let raw = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(source)?
    };
    Ok(raw
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}
