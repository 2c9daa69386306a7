//! Comparison of two run reports
//!
//! Scenarios are matched by id. A regression is a scenario that passed in
//! the baseline and does not pass now.

use std::collections::HashMap;

use serde::Serialize;

use crate::verify::{Status, Verdict};

use super::RunReport;

/// A scenario whose status differs between two runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub id: String,
    pub description: String,
    pub before: Status,
    pub after: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StatusChange {
    fn new(before: &Verdict, after: &Verdict) -> Self {
        Self {
            id: after.id.clone(),
            description: after.description.clone(),
            before: before.status,
            after: after.status,
            reason: after.reason.clone(),
        }
    }
}

/// Differences between a baseline run and a current run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportDiff {
    /// Passed before, not passing now
    pub regressions: Vec<StatusChange>,
    /// Not passing before, passed now
    pub fixes: Vec<StatusChange>,
    /// Failed before and errors now, or the other way round
    pub changed: Vec<StatusChange>,
    /// Ids only present in the current run
    pub added: Vec<String>,
    /// Ids only present in the baseline
    pub removed: Vec<String>,
}

impl ReportDiff {
    /// Compare two reports, listing changes in the current run's order
    pub fn between(baseline: &RunReport, current: &RunReport) -> Self {
        let before: HashMap<&str, &Verdict> = baseline
            .verdicts
            .iter()
            .map(|v| (v.id.as_str(), v))
            .collect();
        let after_ids: std::collections::HashSet<&str> =
            current.verdicts.iter().map(|v| v.id.as_str()).collect();

        let mut diff = ReportDiff::default();

        for verdict in &current.verdicts {
            match before.get(verdict.id.as_str()) {
                None => diff.added.push(verdict.id.clone()),
                Some(old) if old.status == verdict.status => {}
                Some(old) => {
                    let change = StatusChange::new(old, verdict);
                    if old.passed() {
                        diff.regressions.push(change);
                    } else if verdict.passed() {
                        diff.fixes.push(change);
                    } else {
                        diff.changed.push(change);
                    }
                }
            }
        }

        diff.removed = baseline
            .verdicts
            .iter()
            .filter(|v| !after_ids.contains(v.id.as_str()))
            .map(|v| v.id.clone())
            .collect();

        diff
    }

    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.regressions.is_empty()
            && self.fixes.is_empty()
            && self.changed.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
    }
}
