//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::{config_path, DEFAULT_REPORT_FILE};
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Engine under test
    #[serde(default)]
    pub target: TargetConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Line protocol markers
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Composition length bounds
    #[serde(default)]
    pub limits: Limits,

    /// Batch scheduling
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Report output settings
    #[serde(default)]
    pub report: ReportConfig,
}

/// Configuration for the engine binary
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    /// Path to the engine executable (bare names are looked up in PATH)
    #[serde(default = "default_program")]
    pub program: PathBuf,

    /// Additional arguments to pass to the engine
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory for the engine (it usually loads its data relative to it)
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            workdir: None,
        }
    }
}

fn default_program() -> PathBuf {
    PathBuf::from("./test_pinyin")
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Budget for single-round scenarios with at most one selection
    #[serde(default = "default_basic")]
    pub basic_secs: u64,

    /// Budget for scenarios with several rounds or selections
    #[serde(default = "default_multi_round")]
    pub multi_round_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            basic_secs: default_basic(),
            multi_round_secs: default_multi_round(),
        }
    }
}

fn default_basic() -> u64 {
    10
}
fn default_multi_round() -> u64 {
    20
}

/// Markers of the engine's line protocol
#[derive(Debug, Deserialize, Clone)]
pub struct ProtocolConfig {
    /// Token that marks a committed-sentence line
    #[serde(default = "default_commit_marker")]
    pub commit_marker: String,

    /// Command that ends the session
    #[serde(default = "default_quit_command")]
    pub quit_command: String,

    /// Diagnostic printed when a composition exceeds the engine's phrase limit
    #[serde(default = "default_too_long_marker")]
    pub too_long_marker: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            commit_marker: default_commit_marker(),
            quit_command: default_quit_command(),
            too_long_marker: default_too_long_marker(),
        }
    }
}

fn default_commit_marker() -> String {
    "sentence:".to_string()
}
fn default_quit_command() -> String {
    "quit".to_string()
}
fn default_too_long_marker() -> String {
    "too long".to_string()
}

/// Composition length bounds
#[derive(Debug, Deserialize, Clone)]
pub struct Limits {
    /// Expectations with at least this many characters count as over-long
    #[serde(default = "default_phrase_length_bound")]
    pub phrase_length_bound: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            phrase_length_bound: default_phrase_length_bound(),
        }
    }
}

fn default_phrase_length_bound() -> usize {
    16
}

/// Batch scheduling settings
#[derive(Debug, Deserialize, Clone)]
pub struct RunnerConfig {
    /// Maximum number of concurrent sessions
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Delay between scenario launches in sequential mode
    #[serde(default = "default_pacing")]
    pub pacing_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            pacing_ms: default_pacing(),
        }
    }
}

fn default_jobs() -> usize {
    1
}
fn default_pacing() -> u64 {
    50
}

/// Report output settings
#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    /// Where the run report is written
    #[serde(default = "default_report_path")]
    pub path: PathBuf,

    /// How many trailing output lines each verdict keeps
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: default_report_path(),
            tail_lines: default_tail_lines(),
        }
    }
}

fn default_report_path() -> PathBuf {
    PathBuf::from(DEFAULT_REPORT_FILE)
}
fn default_tail_lines() -> usize {
    3
}

impl Config {
    /// Load configuration from an explicit path, or the default config file
    ///
    /// Returns default configuration if no explicit path is given and the
    /// default file doesn't exist
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| super::Error::file_read(path, &e))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.protocol.commit_marker.is_empty() {
            return Err(super::Error::Config(
                "protocol.commit_marker must not be empty".to_string(),
            ));
        }
        if self.runner.jobs == 0 {
            return Err(super::Error::Config("runner.jobs must be at least 1".to_string()));
        }
        for (key, secs) in [
            ("timeouts.basic_secs", self.timeouts.basic_secs),
            ("timeouts.multi_round_secs", self.timeouts.multi_round_secs),
        ] {
            if secs == 0 {
                return Err(super::Error::Config(format!("{} must be positive", key)));
            }
        }
        Ok(())
    }
}
