//! IME conformance harness - black-box tests for a pinyin input-method engine
//!
//! Feeds scripted keystroke sessions to the engine binary over stdin and
//! checks the committed sentences it prints.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use conform::common::{config::Config, logging};
use conform::{cli, commands};

#[derive(Parser)]
#[command(name = "conform", about = "Conformance harness for line-oriented IME engines")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write detailed logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.log_file {
        Some(path) => logging::init_with_file(path),
        None => logging::init_cli(),
    }

    let result = match Config::load(cli.config.as_deref()) {
        Ok(config) => cli::dispatch(cli.command, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
