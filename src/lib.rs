//! IME conformance harness
//!
//! Drives a line-oriented input-method engine through scripted scenarios,
//! checks the sentences it commits and reports pass/fail/error per scenario.

pub mod cli;
pub mod commands;
pub mod common;
pub mod fixture;
pub mod protocol;
pub mod report;
pub mod runner;
pub mod session;
pub mod verify;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use fixture::{Expectation, Scenario};
pub use report::RunReport;
pub use verify::{Status, Verdict};
