//! Structured logging configuration for franken_verdict.
//!
//! Initializes a `tracing` subscriber with:
//! - `RUST_LOG` environment filter support (always wins when set)
//! - Default level derived from the CLI `-v` count
//! - JSON output when `RUST_LOG_FORMAT=json`
//! - Human-readable output otherwise
//!
//! Events go to stderr so stdout stays clean for verdict and report output.

use tracing_subscriber::EnvFilter;

/// Map a repeatable `-v` flag count to a default filter directive.
#[must_use]
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "franken_verdict=info",
        1 => "franken_verdict=debug",
        _ => "franken_verdict=trace",
    }
}

/// Initialize the global tracing subscriber.
///
/// Call this once at program startup (main.rs).
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let is_json = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if is_json {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}
