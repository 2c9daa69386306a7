//! Run reports
//!
//! The aggregator is the only writer of batch totals; everything else
//! (breakdowns, diffs, rendering) is derived from the finished report.

mod diff;
pub mod render;

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{paths, Error, Result};
use crate::verify::{Status, Verdict};

pub use diff::{ReportDiff, StatusChange};

/// Verdict counts for a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub passed: usize,
    pub failed: usize,
    pub error: usize,
    pub total: usize,
    /// Passed although the engine flagged the composition as over-long
    #[serde(default)]
    pub too_long_accepted: usize,
}

impl Totals {
    /// Count one verdict
    pub fn record(&mut self, verdict: &Verdict) {
        match verdict.status {
            Status::Passed => self.passed += 1,
            Status::Failed => self.failed += 1,
            Status::Error => self.error += 1,
        }
        if verdict.too_long_accepted {
            self.too_long_accepted += 1;
        }
        self.total += 1;
    }

    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Passed => self.passed,
            Status::Failed => self.failed,
            Status::Error => self.error,
        }
    }

    /// Percentage of the total, 0 for an empty batch
    pub fn percent(&self, status: Status) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(status) as f64 / self.total as f64 * 100.0
        }
    }

    /// Whether the batch should be treated as green by automation
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.error == 0
    }
}

/// Pass counts for one group of scenarios
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Breakdown {
    pub passed: usize,
    pub total: usize,
}

impl Breakdown {
    fn add(&mut self, verdict: &Verdict) {
        self.total += 1;
        if verdict.passed() {
            self.passed += 1;
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }
}

/// The persisted result of one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Engine binary the batch ran against
    pub program: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub totals: Totals,
    /// Verdicts in submission order
    pub verdicts: Vec<Verdict>,
}

impl RunReport {
    /// Build a report from already collected verdicts
    pub fn aggregate(
        program: impl Into<String>,
        started_at: DateTime<Utc>,
        verdicts: impl IntoIterator<Item = Verdict>,
    ) -> Self {
        let mut aggregator = Aggregator::starting_at(program, started_at);
        for verdict in verdicts {
            aggregator.record(verdict);
        }
        aggregator.finish()
    }

    /// Scenario counts grouped by number of rounds
    pub fn by_round_count(&self) -> BTreeMap<usize, Breakdown> {
        self.group_by(|v| v.rounds)
    }

    /// Scenario counts grouped by number of selections
    pub fn by_selection_count(&self) -> BTreeMap<usize, Breakdown> {
        self.group_by(|v| v.selections)
    }

    /// Scenario counts split by presence of a conversational prefix
    ///
    /// Returns `(with_prefix, without_prefix)`.
    pub fn by_prefix(&self) -> (Breakdown, Breakdown) {
        let mut with = Breakdown::default();
        let mut without = Breakdown::default();
        for verdict in &self.verdicts {
            if verdict.has_prefix() {
                with.add(verdict);
            } else {
                without.add(verdict);
            }
        }
        (with, without)
    }

    fn group_by<F: Fn(&Verdict) -> usize>(&self, key: F) -> BTreeMap<usize, Breakdown> {
        let mut groups: BTreeMap<usize, Breakdown> = BTreeMap::new();
        for verdict in &self.verdicts {
            groups.entry(key(verdict)).or_default().add(verdict);
        }
        groups
    }

    /// Non-passing verdicts, in order
    pub fn failures(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| !v.passed())
    }

    /// Write the report as pretty JSON
    ///
    /// Goes through a temporary file in the same directory so an interrupted
    /// run never leaves a truncated report behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        paths::ensure_parent_dir(path)?;
        let dir = match path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        std::io::Write::write_all(&mut file, b"\n")?;
        file.persist(path)
            .map_err(|e| Error::Report(format!("failed to write '{}': {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), "Report saved");
        Ok(())
    }

    /// Read a report written by `save`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Report(format!("invalid report '{}': {}", path.display(), e)))
    }
}

/// Single writer that accumulates verdicts into a report
#[derive(Debug)]
pub struct Aggregator {
    program: String,
    started_at: DateTime<Utc>,
    totals: Totals,
    verdicts: Vec<Verdict>,
}

impl Aggregator {
    /// Start a batch now
    pub fn new(program: impl Into<String>) -> Self {
        Self::starting_at(program, Utc::now())
    }

    pub fn starting_at(program: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            program: program.into(),
            started_at,
            totals: Totals::default(),
            verdicts: Vec::new(),
        }
    }

    /// Add one verdict; verdicts are kept in the order recorded
    pub fn record(&mut self, verdict: Verdict) {
        self.totals.record(&verdict);
        self.verdicts.push(verdict);
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    /// Close the batch
    pub fn finish(self) -> RunReport {
        let finished_at = Utc::now().max(self.started_at);
        let duration_secs = (finished_at - self.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        RunReport {
            program: self.program,
            started_at: self.started_at,
            finished_at,
            duration_secs,
            totals: self.totals,
            verdicts: self.verdicts,
        }
    }
}
