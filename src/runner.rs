//! Batch runner
//!
//! Drives every scenario through a fresh engine session, verifies the
//! result and feeds verdicts to the aggregator in submission order. At most
//! `jobs` sessions are in flight at once.

use std::path::Path;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};

use crate::common::config::{Config, Timeouts};
use crate::fixture::Scenario;
use crate::protocol::OutputParser;
use crate::report::{Aggregator, RunReport};
use crate::session::{resolve_timeout, SessionDriver};
use crate::verify::{DetailOptions, Verdict, Verifier};

/// Knobs for one batch
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Replaces every scenario's time budget
    pub timeout_override: Option<u64>,
    /// Maximum concurrent sessions
    pub jobs: usize,
    /// Delay between launches when running sequentially
    pub pacing: Duration,
    pub detail: DetailOptions,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout_override: None,
            jobs: config.runner.jobs.max(1),
            pacing: Duration::from_millis(config.runner.pacing_ms),
            detail: DetailOptions {
                tail_lines: config.report.tail_lines,
                keep_output: false,
            },
        }
    }
}

/// Runs scenarios against one engine binary
#[derive(Debug)]
pub struct BatchRunner {
    driver: SessionDriver,
    parser: OutputParser,
    verifier: Verifier,
    timeouts: Timeouts,
    options: RunOptions,
}

impl BatchRunner {
    pub fn new(config: &Config, options: RunOptions) -> Self {
        Self {
            driver: SessionDriver::new(&config.target, &config.protocol),
            parser: OutputParser::new(&config.protocol),
            verifier: Verifier::new(config.limits.phrase_length_bound),
            timeouts: config.timeouts.clone(),
            options,
        }
    }

    pub fn program(&self) -> &Path {
        self.driver.program()
    }

    /// Run and verify a single scenario
    ///
    /// Never fails: launch problems, timeouts and stream errors all come
    /// back as `error` verdicts.
    pub async fn run_scenario(&self, scenario: &Scenario) -> Verdict {
        let budget = resolve_timeout(scenario, &self.timeouts, self.options.timeout_override);
        tracing::debug!(
            scenario = %scenario.id,
            rounds = scenario.rounds.len(),
            budget_secs = budget.as_secs(),
            "Running scenario"
        );

        let transcript = self.driver.run(scenario, budget).await;
        let parsed = self.parser.parse(&transcript);
        let verdict = self
            .verifier
            .judge(scenario, &transcript, &parsed, self.options.detail);

        tracing::debug!(
            scenario = %scenario.id,
            status = %verdict.status,
            commits = parsed.len(),
            "Scenario finished"
        );
        verdict
    }

    /// Run a whole batch
    ///
    /// `on_verdict` is called once per scenario, in fixture order, with the
    /// 1-based position and the batch size.
    pub async fn run_batch<F>(&self, scenarios: &[Scenario], mut on_verdict: F) -> RunReport
    where
        F: FnMut(usize, usize, &Verdict),
    {
        let total = scenarios.len();
        let jobs = self.options.jobs.max(1);
        let pacing = if jobs == 1 {
            self.options.pacing
        } else {
            Duration::ZERO
        };

        tracing::info!(
            program = %self.program().display(),
            scenarios = total,
            jobs,
            "Starting batch"
        );

        let mut aggregator = Aggregator::new(self.program().display().to_string());

        let mut verdicts = stream::iter(scenarios.iter().enumerate())
            .map(|(index, scenario)| async move {
                if index > 0 && !pacing.is_zero() {
                    tokio::time::sleep(pacing).await;
                }
                self.run_scenario(scenario).await
            })
            .buffered(jobs);

        while let Some(verdict) = verdicts.next().await {
            on_verdict(aggregator.totals().total + 1, total, &verdict);
            aggregator.record(verdict);
        }

        let report = aggregator.finish();
        tracing::info!(
            passed = report.totals.passed,
            failed = report.totals.failed,
            error = report.totals.error,
            "Batch finished in {:.2}s",
            report.duration_secs
        );
        report
    }
}
