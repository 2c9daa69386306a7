//! Logging and tracing configuration
//!
//! Logs always go to stderr so that stdout stays free for the progress
//! stream and `--json` reports.

use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("conform=info,warn"))
}

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli() {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing with an additional log file
///
/// The file gets full details (thread ids, source lines, no ANSI colors).
/// Falls back to stderr-only logging if the file cannot be opened.
pub fn init_with_file(log_file: &Path) {
    if let Err(e) = super::paths::ensure_parent_dir(log_file) {
        eprintln!("Warning: Could not create log directory: {}", e);
    }

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
    {
        Ok(file) => {
            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);

            let stderr_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .compact();

            tracing_subscriber::registry()
                .with(default_filter())
                .with(file_layer)
                .with(stderr_layer)
                .init();
        }
        Err(e) => {
            eprintln!("Warning: Could not open log file: {}", e);
            init_cli();
        }
    }
}
