//! CLI command handling
//!
//! Dispatches CLI commands and formats their output. Every command returns
//! the process exit code: 0 when clean, 1 when a scenario did not pass or a
//! diff found regressions.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::fixture::{self, Scenario};
use crate::report::{render, ReportDiff, RunReport};
use crate::runner::{BatchRunner, RunOptions};
use crate::verify::Verdict;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: Config) -> Result<i32> {
    match command {
        Commands::Run {
            fixtures,
            program,
            args,
            workdir,
            timeout,
            report,
            jobs,
            only,
            json,
            keep_output,
            verbose,
        } => {
            let mut config = config;
            if let Some(program) = program {
                config.target.program = program;
            }
            if !args.is_empty() {
                config.target.args = args;
            }
            if workdir.is_some() {
                config.target.workdir = workdir;
            }
            if let Some(jobs) = jobs {
                if jobs == 0 {
                    return Err(Error::Config("--jobs must be at least 1".to_string()));
                }
                config.runner.jobs = jobs;
            }
            if timeout == Some(0) {
                return Err(Error::Config("--timeout must be positive".to_string()));
            }

            let scenarios = select(fixture::load_all(&fixtures)?, &only)?;
            let report_path = report.unwrap_or_else(|| config.report.path.clone());

            let mut options = RunOptions::from_config(&config);
            options.timeout_override = timeout;
            options.detail.keep_output = keep_output;

            let runner = BatchRunner::new(&config, options);

            if !json {
                println!(
                    "Running {} scenario(s) against {}",
                    scenarios.len(),
                    runner.program().display()
                );
                println!();
            }

            let report = runner
                .run_batch(&scenarios, |index, total, verdict| {
                    if !json {
                        print_progress(index, total, verdict, verbose);
                    }
                })
                .await;

            report.save(&report_path)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!();
                print!("{}", render::summary(&report));
                print!("{}", render::failures(&report));
                print!("{}", render::breakdowns(&report));
                println!("\nReport written to {}", report_path.display());
            }

            Ok(if report.totals.all_passed() { 0 } else { 1 })
        }

        Commands::Check { fixtures } => {
            let scenarios = fixture::load_all(&fixtures)?;

            let mut by_rounds: BTreeMap<usize, usize> = BTreeMap::new();
            for scenario in &scenarios {
                *by_rounds.entry(scenario.rounds.len()).or_default() += 1;
            }
            let with_prefix = scenarios.iter().filter(|s| s.has_prefix()).count();
            let over_long = scenarios
                .iter()
                .filter(|s| s.is_over_long(config.limits.phrase_length_bound))
                .count();

            println!(
                "{} scenario(s) in {} file(s) are valid",
                scenarios.len(),
                fixtures.len()
            );
            for (rounds, count) in by_rounds {
                println!("  {}-round: {}", rounds, count);
            }
            println!("  With prefix: {}", with_prefix);
            if over_long > 0 {
                println!("  Over-long: {}", over_long);
            }

            Ok(0)
        }

        Commands::Summary { report } => {
            let path: PathBuf = report.unwrap_or_else(|| config.report.path.clone());
            let report = RunReport::load(&path)?;

            println!(
                "Run of {} started {}",
                report.program,
                report.started_at.to_rfc3339()
            );
            print!("{}", render::summary(&report));
            print!("{}", render::failures(&report));
            print!("{}", render::breakdowns(&report));

            Ok(if report.totals.all_passed() { 0 } else { 1 })
        }

        Commands::Diff {
            baseline,
            current,
            json,
        } => {
            let before = RunReport::load(&baseline)?;
            let after = RunReport::load(&current)?;
            let diff = ReportDiff::between(&before, &after);

            if json {
                println!("{}", serde_json::to_string_pretty(&diff)?);
            } else {
                print!("{}", render::diff(&diff));
            }

            Ok(if diff.has_regressions() { 1 } else { 0 })
        }
    }
}

/// Restrict a batch to the requested ids, keeping fixture order
fn select(scenarios: Vec<Scenario>, only: &[String]) -> Result<Vec<Scenario>> {
    if only.is_empty() {
        return Ok(scenarios);
    }

    let selected: Vec<Scenario> = scenarios
        .into_iter()
        .filter(|s| only.iter().any(|id| id == &s.id))
        .collect();

    if selected.is_empty() {
        return Err(Error::Fixture(format!(
            "no scenario matches --only {}",
            only.join(", ")
        )));
    }
    Ok(selected)
}

fn print_progress(index: usize, total: usize, verdict: &Verdict, verbose: bool) {
    println!("{}", render::progress_line(index, total, verdict));
    for line in render::verdict_details(verdict) {
        println!("{}", line);
    }
    if verbose && !verdict.passed() {
        for line in &verdict.stdout_tail {
            println!("        | {}", line);
        }
    }
}
