//! Fixture file loading
//!
//! Reads YAML or JSON fixture files. Besides the canonical scenario layout,
//! the record shapes written by the older phrase generators are recognised
//! and converted, so existing fixture sets can be run unchanged.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::common::{Error, Result};

use super::model::{Expectation, Round, Scenario};

/// Single-shot record: prefix, one input, first candidate, substring check
#[derive(Deserialize)]
struct LegacySingle {
    id: Value,
    #[serde(default)]
    prefix: String,
    pinyin: String,
    #[serde(default)]
    expected_contains: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    full_sentence: Option<String>,
}

impl LegacySingle {
    fn into_scenario(self) -> Result<Scenario> {
        let expect = match self.expected_contains {
            Some(s) => Expectation::Contains(s),
            None => Expectation::Liveness,
        };
        Ok(Scenario {
            id: id_to_string(&self.id)?,
            description: self.description,
            prefix: Some(self.prefix),
            timeout_secs: None,
            over_long: false,
            full_sentence: self.full_sentence,
            rounds: vec![Round::new(self.pinyin, vec![0], expect)],
        })
    }
}

/// Multi-round record: no prefix, no id, exact match per round
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LegacyMultiRound {
    #[serde(default)]
    description: String,
    rounds: Vec<Round>,
}

/// Id for a record that has none: file stem plus 1-based position, so
/// several legacy files can share a batch
fn positional_id(origin: &Path, index: usize) -> String {
    match origin.file_stem().and_then(|s| s.to_str()) {
        Some(stem) if !stem.is_empty() => format!("{}-{}", stem, index + 1),
        _ => (index + 1).to_string(),
    }
}

fn id_to_string(id: &Value) -> Result<String> {
    match id {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(Error::Fixture(format!("unsupported id value {}", other))),
    }
}

/// Which record shape a fixture entry uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Canonical,
    LegacySingle,
    LegacyMultiRound,
}

/// Keys only the canonical layout has; a record carrying any of them is
/// canonical even when its id is missing
const CANONICAL_ONLY_KEYS: [&str; 4] = ["prefix", "timeout_secs", "over_long", "full_sentence"];

fn classify(record: &Value) -> Option<RecordKind> {
    let obj = record.as_object()?;
    let canonical_only = CANONICAL_ONLY_KEYS.iter().any(|k| obj.contains_key(*k));
    match (obj.contains_key("rounds"), obj.contains_key("id")) {
        (true, true) => Some(RecordKind::Canonical),
        (true, false) if canonical_only => Some(RecordKind::Canonical),
        (true, false) => Some(RecordKind::LegacyMultiRound),
        (false, _) if obj.contains_key("pinyin") => Some(RecordKind::LegacySingle),
        _ => None,
    }
}

/// Parse a fixture document (already decoded into a JSON value)
///
/// `origin` is used only for error messages.
pub fn parse_document(document: Value, origin: &Path) -> Result<Vec<Scenario>> {
    let records = match document {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("scenarios") {
            Some(Value::Array(records)) => records,
            _ => {
                return Err(Error::fixture_parse(
                    origin,
                    "expected a list of scenarios or a 'scenarios' list",
                ))
            }
        },
        _ => {
            return Err(Error::fixture_parse(
                origin,
                "expected a list of scenarios or a 'scenarios' list",
            ))
        }
    };

    let mut scenarios = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let kind = classify(&record).ok_or_else(|| {
            Error::fixture_parse(origin, format!("record {}: unrecognised layout", index + 1))
        })?;
        let at = |e: &dyn std::fmt::Display| {
            Error::fixture_parse(origin, format!("record {}: {}", index + 1, e))
        };

        let scenario = match kind {
            RecordKind::Canonical => serde_json::from_value::<Scenario>(record).map_err(|e| at(&e))?,
            RecordKind::LegacySingle => serde_json::from_value::<LegacySingle>(record)
                .map_err(|e| at(&e))?
                .into_scenario()
                .map_err(|e| at(&e))?,
            RecordKind::LegacyMultiRound => {
                let legacy: LegacyMultiRound =
                    serde_json::from_value(record).map_err(|e| at(&e))?;
                Scenario {
                    id: positional_id(origin, index),
                    description: legacy.description,
                    prefix: None,
                    timeout_secs: None,
                    over_long: false,
                    full_sentence: None,
                    rounds: legacy.rounds,
                }
            }
        };
        validate_scenario(&scenario).map_err(|e| at(&e))?;
        scenarios.push(scenario);
    }

    tracing::debug!(
        path = %origin.display(),
        count = scenarios.len(),
        "Parsed fixture document"
    );
    Ok(scenarios)
}

/// Load one fixture file, choosing the decoder from its extension
pub fn load_file(path: &Path) -> Result<Vec<Scenario>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let document: Value = if is_json {
        serde_json::from_str(&content).map_err(|e| Error::fixture_parse(path, e))?
    } else {
        serde_yaml::from_str(&content).map_err(|e| Error::fixture_parse(path, e))?
    };

    parse_document(document, path)
}

/// Load a batch of fixture files in order, rejecting duplicate ids
pub fn load_all(paths: &[PathBuf]) -> Result<Vec<Scenario>> {
    let mut scenarios = Vec::new();
    let mut seen = HashSet::new();

    for path in paths {
        for scenario in load_file(path)? {
            if !seen.insert(scenario.id.clone()) {
                return Err(Error::Fixture(format!(
                    "duplicate scenario id '{}' in '{}'",
                    scenario.id,
                    path.display()
                )));
            }
            scenarios.push(scenario);
        }
    }

    Ok(scenarios)
}

/// Check structural rules the type system doesn't enforce
pub fn validate_scenario(scenario: &Scenario) -> Result<()> {
    if scenario.id.trim().is_empty() {
        return Err(Error::Fixture("scenario id must not be empty".to_string()));
    }
    if let Some(prefix) = &scenario.prefix {
        if prefix.contains('\n') {
            return Err(Error::Fixture(format!(
                "scenario '{}': prefix must be a single line",
                scenario.id
            )));
        }
    }
    if scenario.timeout_secs == Some(0) {
        return Err(Error::Fixture(format!(
            "scenario '{}': timeout_secs must be positive",
            scenario.id
        )));
    }

    for (i, round) in scenario.rounds.iter().enumerate() {
        let round_num = i + 1;
        if round.input.trim().is_empty() {
            return Err(Error::Fixture(format!(
                "scenario '{}' round {}: input must not be empty",
                scenario.id, round_num
            )));
        }
        if round.input.contains('\n') {
            return Err(Error::Fixture(format!(
                "scenario '{}' round {}: input must be a single line",
                scenario.id, round_num
            )));
        }
        if round.expect.value().is_some_and(str::is_empty) {
            return Err(Error::Fixture(format!(
                "scenario '{}' round {}: {} expectation must not be empty",
                scenario.id,
                round_num,
                round.expect.policy()
            )));
        }
    }

    Ok(())
}
