//! Verdict types
//!
//! These are persisted verbatim in run reports, so field names are part of
//! the report format.

use serde::{Deserialize, Serialize};

use crate::fixture::MatchPolicy;
use crate::session::{ErrorReason, ExitDisposition};

/// Classified outcome of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Passed,
    Failed,
    Error,
}

impl Status {
    /// Progress symbol used in console output
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Passed => "✓",
            Status::Failed => "✗",
            Status::Error => "E",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Passed => write!(f, "passed"),
            Status::Failed => write!(f, "failed"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// Why a round did not match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundFailure {
    #[serde(rename = "missing result")]
    MissingResult,
    #[serde(rename = "mismatch")]
    Mismatch,
    #[serde(rename = "empty result")]
    EmptyResult,
}

impl std::fmt::Display for RoundFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundFailure::MissingResult => write!(f, "missing result"),
            RoundFailure::Mismatch => write!(f, "mismatch"),
            RoundFailure::EmptyResult => write!(f, "empty result"),
        }
    }
}

/// Check result for one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// 1-based round number
    pub round: usize,
    pub policy: MatchPolicy,
    pub expected: Option<String>,
    /// Committed text at this position, absent when the engine produced too few
    pub actual: Option<String>,
    pub matched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RoundFailure>,
}

/// Full verdict for one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Number of rounds in the scenario
    pub rounds: usize,
    /// Number of selections across all rounds
    pub selections: usize,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Passed although the engine flagged the composition as over-long
    #[serde(default)]
    pub too_long_accepted: bool,
    pub outcomes: Vec<RoundOutcome>,
    /// Commit lines beyond the number of rounds; never matched against anything
    #[serde(default)]
    pub extra_results: usize,
    pub exit: ExitDisposition,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stdout_tail: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stderr_tail: Vec<String>,
    /// Full stdout, kept only on request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.status == Status::Passed
    }

    pub fn has_prefix(&self) -> bool {
        self.prefix.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// The first round that did not match, if any
    pub fn first_mismatch(&self) -> Option<&RoundOutcome> {
        self.outcomes.iter().find(|o| !o.matched)
    }
}
