//! Error types for the conformance harness
//!
//! File-level problems (unreadable fixtures, bad config, unwritable report)
//! abort the command. Session-level problems are caught per scenario and
//! turned into `error` verdicts, so they never stop a batch.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Session Errors ===
    #[error("Failed to launch '{program}': {reason}")]
    LaunchFailed { program: String, reason: String },

    #[error("Session timed out after {}", describe_budget(.0))]
    Timeout(Duration),

    // === Fixture Errors ===
    #[error("Invalid fixture: {0}")]
    Fixture(String),

    #[error("Failed to parse fixture file '{path}': {reason}")]
    FixtureParse { path: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Report Errors ===
    #[error("Report error: {0}")]
    Report(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a launch failure for a program path
    pub fn launch_failed(program: &str, reason: &str) -> Self {
        Self::LaunchFailed {
            program: program.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a fixture parse error for a file
    pub fn fixture_parse<E: std::fmt::Display>(path: &std::path::Path, error: E) -> Self {
        Self::FixtureParse {
            path: path.display().to_string(),
            reason: error.to_string(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Process exit code for errors that abort a command
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Whole seconds when the budget is whole, milliseconds otherwise
fn describe_budget(budget: &Duration) -> String {
    if budget.subsec_millis() == 0 {
        format!("{} seconds", budget.as_secs())
    } else {
        format!("{}ms", budget.as_millis())
    }
}
