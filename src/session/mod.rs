//! Session driver
//!
//! Runs one scenario against one fresh engine process: writes the whole
//! input script up front, waits for the process under a timeout, and
//! captures everything it printed.

mod driver;
mod process;
mod script;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::config::Timeouts;
use crate::fixture::Scenario;

pub use driver::SessionDriver;
pub use script::{build_script, script_lines};

/// How the engine process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitDisposition {
    /// Exited on its own; `code` is absent when a signal ended it
    Exited { code: Option<i32> },
    /// Exceeded its time budget and was killed
    KilledOnTimeout,
    /// Killed by the harness after a stream failure
    Killed,
    /// Never started
    NotStarted,
}

impl ExitDisposition {
    pub fn is_clean(&self) -> bool {
        matches!(self, ExitDisposition::Exited { code: Some(0) })
    }
}

impl std::fmt::Display for ExitDisposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitDisposition::Exited { code: Some(code) } => write!(f, "exited with code {}", code),
            ExitDisposition::Exited { code: None } => write!(f, "terminated by signal"),
            ExitDisposition::KilledOnTimeout => write!(f, "killed on timeout"),
            ExitDisposition::Killed => write!(f, "killed"),
            ExitDisposition::NotStarted => write!(f, "not started"),
        }
    }
}

/// Why a session could not be checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    Timeout,
    LaunchFailure,
    IoFailure,
}

impl std::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorReason::Timeout => write!(f, "timeout"),
            ErrorReason::LaunchFailure => write!(f, "launch_failure"),
            ErrorReason::IoFailure => write!(f, "io_failure"),
        }
    }
}

/// A failure reported by the driver itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFault {
    pub reason: ErrorReason,
    pub message: String,
}

/// Everything captured from one scenario run
#[derive(Debug, Clone)]
pub struct Transcript {
    /// Captured stdout, possibly partial
    pub stdout: String,
    /// Captured stderr, possibly partial
    pub stderr: String,
    pub exit: ExitDisposition,
    /// Set when the run cannot be meaningfully verified
    pub fault: Option<SessionFault>,
    pub elapsed: Duration,
}

impl Transcript {
    /// Transcript for a process that could not be started
    pub fn launch_failure(message: String, elapsed: Duration) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit: ExitDisposition::NotStarted,
            fault: Some(SessionFault {
                reason: ErrorReason::LaunchFailure,
                message,
            }),
            elapsed,
        }
    }

    /// The error classification, if any
    pub fn error_reason(&self) -> Option<ErrorReason> {
        self.fault.as_ref().map(|f| f.reason)
    }

    pub fn timed_out(&self) -> bool {
        self.exit == ExitDisposition::KilledOnTimeout
    }
}

/// Pick the time budget for a scenario
///
/// An explicit override wins, then the scenario's own setting, then the
/// longer budget for multi-step scenarios, then the basic budget.
pub fn resolve_timeout(scenario: &Scenario, timeouts: &Timeouts, override_secs: Option<u64>) -> Duration {
    let secs = override_secs
        .or(scenario.timeout_secs)
        .unwrap_or(if scenario.is_multi_step() {
            timeouts.multi_round_secs
        } else {
            timeouts.basic_secs
        });
    Duration::from_secs(secs)
}
