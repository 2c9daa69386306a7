//! Human-readable rendering of verdicts and reports

use std::fmt::Write;

use colored::Colorize;

use crate::common::truncate_chars;
use crate::verify::{Status, Verdict};

use super::{ReportDiff, RunReport, StatusChange};

const RULE_WIDTH: usize = 70;
const DESCRIPTION_WIDTH: usize = 50;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn colored_symbol(status: Status) -> colored::ColoredString {
    match status {
        Status::Passed => status.symbol().green(),
        Status::Failed => status.symbol().red(),
        Status::Error => status.symbol().yellow(),
    }
}

fn quoted(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("'{}'", v),
        None => "(none)".to_string(),
    }
}

/// One progress line, printed as each scenario completes
pub fn progress_line(index: usize, total: usize, verdict: &Verdict) -> String {
    let width = total.to_string().len().max(3);
    format!(
        "[{:>width$}/{}] {} Test #{}: {} ({} round{})",
        index,
        total,
        colored_symbol(verdict.status),
        verdict.id,
        truncate_chars(&verdict.description, DESCRIPTION_WIDTH),
        verdict.rounds,
        if verdict.rounds == 1 { "" } else { "s" },
        width = width
    )
}

/// Indented detail lines shown under a progress line
///
/// Non-passing verdicts show the reason and every unmatched round; passing
/// verdicts show their note, if any.
pub fn verdict_details(verdict: &Verdict) -> Vec<String> {
    let mut lines = Vec::new();
    let indent = "        ";

    match verdict.status {
        Status::Passed => {
            if let Some(note) = &verdict.note {
                lines.push(format!("{}Note: {}", indent, note.dimmed()));
            }
        }
        Status::Failed | Status::Error => {
            let reason = verdict.reason.as_deref().unwrap_or("Unknown");
            match verdict.error {
                Some(code) => lines.push(format!("{}Reason: [{}] {}", indent, code, reason)),
                None => lines.push(format!("{}Reason: {}", indent, reason)),
            }
            if verdict.status == Status::Failed {
                for outcome in verdict.outcomes.iter().filter(|o| !o.matched) {
                    lines.push(format!(
                        "{}Round {}: expected {} ({}), got {}",
                        indent,
                        outcome.round,
                        quoted(outcome.expected.as_deref()),
                        outcome.policy,
                        quoted(outcome.actual.as_deref()),
                    ));
                }
            }
        }
    }

    lines
}

/// Totals block printed at the end of a run
pub fn summary(report: &RunReport) -> String {
    let t = &report.totals;
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "\n{}", "Test Summary:".bold());
    let _ = writeln!(out, "  Total:    {}", t.total);
    let _ = writeln!(
        out,
        "  Passed:   {} ({:.1}%)",
        t.passed.to_string().green(),
        t.percent(Status::Passed)
    );
    let _ = writeln!(
        out,
        "  Failed:   {} ({:.1}%)",
        t.failed.to_string().red(),
        t.percent(Status::Failed)
    );
    let _ = writeln!(
        out,
        "  Errors:   {} ({:.1}%)",
        t.error.to_string().yellow(),
        t.percent(Status::Error)
    );
    if t.too_long_accepted > 0 {
        let _ = writeln!(out, "  Accepted despite over-long: {}", t.too_long_accepted);
    }
    let _ = writeln!(out, "  Duration: {:.2} seconds", report.duration_secs);

    out
}

/// Expanded block for every non-passing scenario
pub fn failures(report: &RunReport) -> String {
    let failures: Vec<&Verdict> = report.failures().collect();
    let mut out = String::new();

    if failures.is_empty() {
        let _ = writeln!(out, "\n{}", "All tests passed!".green().bold());
        return out;
    }

    let _ = writeln!(out, "\n{}", rule());
    let _ = writeln!(out, "Failed/Error Tests ({}):", failures.len());
    let _ = writeln!(out, "{}", rule());

    for (i, verdict) in failures.iter().enumerate() {
        let _ = writeln!(out, "\n[{}] Test #{}: {}", i + 1, verdict.id, verdict.description);
        let _ = writeln!(out, "    Status: {}", verdict.status);
        if let Some(prefix) = &verdict.prefix {
            let _ = writeln!(out, "    Prefix: '{}'", prefix);
        }
        let _ = writeln!(out, "    Process: {}", verdict.exit);
        if let Some(code) = verdict.error {
            let _ = writeln!(out, "    Error: {}", code);
        }
        let _ = writeln!(
            out,
            "    Reason: {}",
            verdict.reason.as_deref().unwrap_or("Unknown")
        );

        if !verdict.outcomes.is_empty() {
            let _ = writeln!(out, "    Rounds:");
            for outcome in &verdict.outcomes {
                let mark = if outcome.matched { "✓".green() } else { "✗".red() };
                let _ = writeln!(
                    out,
                    "      Round {} {}: expected {} ({})",
                    outcome.round,
                    mark,
                    quoted(outcome.expected.as_deref()),
                    outcome.policy
                );
                if !outcome.matched {
                    let _ = writeln!(
                        out,
                        "                 got {}",
                        quoted(outcome.actual.as_deref())
                    );
                }
            }
        }

        if !verdict.stdout_tail.is_empty() {
            let _ = writeln!(out, "    Output (last {} lines):", verdict.stdout_tail.len());
            for line in &verdict.stdout_tail {
                let _ = writeln!(out, "      {}", line.dimmed());
            }
        }
        if !verdict.stderr_tail.is_empty() {
            let _ = writeln!(out, "    Stderr (last {} lines):", verdict.stderr_tail.len());
            for line in &verdict.stderr_tail {
                let _ = writeln!(out, "      {}", line.dimmed());
            }
        }
    }

    out
}

/// Pass rates by interaction depth and by conversational context
pub fn breakdowns(report: &RunReport) -> String {
    let mut out = String::new();
    if report.verdicts.is_empty() {
        return out;
    }

    let _ = writeln!(out, "\n{}", rule());
    let _ = writeln!(out, "Detailed Statistics:");
    let _ = writeln!(out, "{}", rule());

    let _ = writeln!(out, "\nBy number of rounds:");
    for (rounds, b) in report.by_round_count() {
        let _ = writeln!(
            out,
            "  {}-round: {}/{} passed ({:.1}%)",
            rounds,
            b.passed,
            b.total,
            b.pass_rate()
        );
    }

    let _ = writeln!(out, "\nBy number of selections:");
    for (selections, b) in report.by_selection_count() {
        let _ = writeln!(
            out,
            "  {}-step: {}/{} passed ({:.1}%)",
            selections,
            b.passed,
            b.total,
            b.pass_rate()
        );
    }

    let (with, without) = report.by_prefix();
    let _ = writeln!(out, "\nBy prefix usage:");
    if with.total > 0 {
        let _ = writeln!(
            out,
            "  With prefix: {}/{} passed ({:.1}%)",
            with.passed,
            with.total,
            with.pass_rate()
        );
    }
    if without.total > 0 {
        let _ = writeln!(
            out,
            "  Without prefix: {}/{} passed ({:.1}%)",
            without.passed,
            without.total,
            without.pass_rate()
        );
    }

    out
}

fn change_line(change: &StatusChange) -> String {
    let mut line = format!(
        "  #{}: {} -> {}  {}",
        change.id,
        change.before,
        change.after,
        truncate_chars(&change.description, DESCRIPTION_WIDTH)
    );
    if let Some(reason) = &change.reason {
        let _ = write!(line, " ({})", reason);
    }
    line
}

/// Regression listing for `diff`
pub fn diff(diff: &ReportDiff) -> String {
    let mut out = String::new();

    if diff.is_empty() {
        let _ = writeln!(out, "No differences between runs");
        return out;
    }

    if !diff.regressions.is_empty() {
        let _ = writeln!(out, "{} ({}):", "Regressions".red().bold(), diff.regressions.len());
        for change in &diff.regressions {
            let _ = writeln!(out, "{}", change_line(change));
        }
    }
    if !diff.fixes.is_empty() {
        let _ = writeln!(out, "{} ({}):", "Fixed".green().bold(), diff.fixes.len());
        for change in &diff.fixes {
            let _ = writeln!(out, "{}", change_line(change));
        }
    }
    if !diff.changed.is_empty() {
        let _ = writeln!(out, "Changed ({}):", diff.changed.len());
        for change in &diff.changed {
            let _ = writeln!(out, "{}", change_line(change));
        }
    }
    if !diff.added.is_empty() {
        let _ = writeln!(out, "Added: {}", diff.added.join(", "));
    }
    if !diff.removed.is_empty() {
        let _ = writeln!(out, "Removed: {}", diff.removed.join(", "));
    }

    out
}
