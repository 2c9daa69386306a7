//! Fixture model and loading
//!
//! Fixtures describe scripted conversations with the engine: rounds of
//! romanized input and candidate choices, each with an expected commit.

mod loader;
mod model;

pub use loader::{load_all, load_file, parse_document, validate_scenario};
pub use model::*;
