//! CLI command definitions
//!
//! Defines the clap commands for the conformance harness.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenarios against the engine and write a report
    Run {
        /// Fixture files (YAML or JSON)
        #[arg(required = true)]
        fixtures: Vec<PathBuf>,

        /// Engine executable (overrides target.program)
        #[arg(long, short)]
        program: Option<PathBuf>,

        /// Argument to pass to the engine, can be repeated
        #[arg(long = "arg")]
        args: Vec<String>,

        /// Working directory for the engine
        #[arg(long)]
        workdir: Option<PathBuf>,

        /// Time budget in seconds for every scenario
        #[arg(long, short)]
        timeout: Option<u64>,

        /// Where to write the run report
        #[arg(long, short)]
        report: Option<PathBuf>,

        /// Maximum number of concurrent sessions
        #[arg(long, short)]
        jobs: Option<usize>,

        /// Only run scenarios with these ids, can be repeated
        #[arg(long = "only")]
        only: Vec<String>,

        /// Print the report as JSON on stdout instead of progress lines
        #[arg(long)]
        json: bool,

        /// Keep full engine output for every scenario in the report
        #[arg(long)]
        keep_output: bool,

        /// Show the engine's last output lines for failures as they happen
        #[arg(long, short)]
        verbose: bool,
    },

    /// Validate fixture files without running anything
    Check {
        /// Fixture files (YAML or JSON)
        #[arg(required = true)]
        fixtures: Vec<PathBuf>,
    },

    /// Print the summary of a saved report
    Summary {
        /// Report file (defaults to report.path)
        report: Option<PathBuf>,
    },

    /// Compare two saved reports and list regressions
    Diff {
        /// Earlier report
        baseline: PathBuf,

        /// Later report
        current: PathBuf,

        /// Print the comparison as JSON
        #[arg(long)]
        json: bool,
    },
}
