//! Verification engine
//!
//! Round `i` is checked against the `i`-th committed sentence. Fewer commits
//! than rounds is a failure; extra commits are counted but never shifted
//! onto later rounds.

mod verdict;

pub use verdict::{RoundFailure, RoundOutcome, Status, Verdict};

use crate::common::tail_lines;
use crate::fixture::{Expectation, Scenario};
use crate::protocol::ParsedResult;
use crate::session::{ExitDisposition, Transcript};

/// Options controlling how much transcript detail a verdict keeps
#[derive(Debug, Clone, Copy)]
pub struct DetailOptions {
    pub tail_lines: usize,
    pub keep_output: bool,
}

impl Default for DetailOptions {
    fn default() -> Self {
        Self {
            tail_lines: 3,
            keep_output: false,
        }
    }
}

/// Applies match policies to parsed results
#[derive(Debug, Clone)]
pub struct Verifier {
    phrase_length_bound: usize,
}

impl Verifier {
    pub fn new(phrase_length_bound: usize) -> Self {
        Self {
            phrase_length_bound,
        }
    }

    /// Check parsed results against a scenario's expectations
    ///
    /// Pure: the same inputs always yield the same verdict. The verdict's
    /// process fields are placeholders until `judge` attaches a transcript.
    pub fn verify(&self, scenario: &Scenario, parsed: &ParsedResult) -> Verdict {
        let outcomes: Vec<RoundOutcome> = scenario
            .rounds
            .iter()
            .enumerate()
            .map(|(i, round)| check_round(i, &round.expect, parsed.get(i)))
            .collect();

        let expected_count = scenario.rounds.len();
        let missing = parsed.len() < expected_count;
        let all_matched = outcomes.iter().all(|o| o.matched);

        let (status, reason) = if all_matched && !missing {
            (Status::Passed, None)
        } else if missing {
            (
                Status::Failed,
                Some(format!(
                    "expected {} results, got {}",
                    expected_count,
                    parsed.len()
                )),
            )
        } else {
            let failed: Vec<usize> = outcomes
                .iter()
                .filter(|o| !o.matched)
                .map(|o| o.round)
                .collect();
            (Status::Failed, Some(format!("round(s) {:?} failed", failed)))
        };

        let mut verdict = Verdict {
            id: scenario.id.clone(),
            description: scenario.description.clone(),
            prefix: scenario.prefix.clone(),
            rounds: expected_count,
            selections: scenario.total_selections(),
            status,
            error: None,
            reason,
            note: None,
            too_long_accepted: false,
            outcomes,
            extra_results: parsed.len().saturating_sub(expected_count),
            exit: ExitDisposition::Exited { code: Some(0) },
            duration_ms: 0,
            stdout_tail: Vec::new(),
            stderr_tail: Vec::new(),
            stdout: None,
        };

        if verdict.passed() && parsed.too_long {
            if scenario.is_over_long(self.phrase_length_bound) {
                verdict.note = Some(format!(
                    "accepted despite exceeding phrase length bound ({} chars)",
                    scenario.composition_len()
                ));
                verdict.too_long_accepted = true;
            } else {
                verdict.note = Some("engine reported an over-long composition".to_string());
            }
        }

        verdict
    }

    /// Verify a finished session, letting driver errors supersede mismatches
    ///
    /// For error transcripts the round outcomes are still computed from the
    /// partial output, but only as diagnostics; the verdict is `error`.
    pub fn judge(
        &self,
        scenario: &Scenario,
        transcript: &Transcript,
        parsed: &ParsedResult,
        detail: DetailOptions,
    ) -> Verdict {
        let mut verdict = self.verify(scenario, parsed);

        verdict.exit = transcript.exit;
        verdict.duration_ms = transcript.elapsed.as_millis() as u64;

        if let Some(fault) = &transcript.fault {
            verdict.status = Status::Error;
            verdict.error = Some(fault.reason);
            verdict.reason = Some(fault.message.clone());
            verdict.note = None;
            verdict.too_long_accepted = false;
        }

        if verdict.status != Status::Passed || detail.keep_output {
            verdict.stdout_tail = tail_lines(&transcript.stdout, detail.tail_lines);
            verdict.stderr_tail = tail_lines(&transcript.stderr, detail.tail_lines);
        }
        if detail.keep_output {
            verdict.stdout = Some(transcript.stdout.clone());
        }

        verdict
    }
}

fn check_round(index: usize, expect: &Expectation, actual: Option<&str>) -> RoundOutcome {
    let (matched, failure) = match actual {
        None => (false, Some(RoundFailure::MissingResult)),
        Some(text) if expect.is_satisfied_by(text) => (true, None),
        Some(_) if *expect == Expectation::Liveness => (false, Some(RoundFailure::EmptyResult)),
        Some(_) => (false, Some(RoundFailure::Mismatch)),
    };

    RoundOutcome {
        round: index + 1,
        policy: expect.policy(),
        expected: expect.value().map(str::to_string),
        actual: actual.map(str::to_string),
        matched,
        failure,
    }
}
