//! Scenario and round types
//!
//! A scenario is the unit of execution: all of its rounds are fed to one
//! engine process, whose composition buffer carries over from round to round.

use serde::{Deserialize, Deserializer, Serialize};

/// How a round's committed text is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Committed text must equal the expectation
    Exact,
    /// Expectation must be a substring of the committed text
    Contains,
    /// Any non-empty committed text passes
    Liveness,
}

impl std::fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchPolicy::Exact => write!(f, "exact"),
            MatchPolicy::Contains => write!(f, "contains"),
            MatchPolicy::Liveness => write!(f, "liveness"),
        }
    }
}

/// Expected committed text for one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Exact(String),
    Contains(String),
    /// No correctness check, only that something was committed
    Liveness,
}

impl Expectation {
    pub fn policy(&self) -> MatchPolicy {
        match self {
            Expectation::Exact(_) => MatchPolicy::Exact,
            Expectation::Contains(_) => MatchPolicy::Contains,
            Expectation::Liveness => MatchPolicy::Liveness,
        }
    }

    /// The expected string, absent for liveness-only rounds
    pub fn value(&self) -> Option<&str> {
        match self {
            Expectation::Exact(s) | Expectation::Contains(s) => Some(s),
            Expectation::Liveness => None,
        }
    }

    /// Check a committed string against this expectation
    pub fn is_satisfied_by(&self, actual: &str) -> bool {
        match self {
            Expectation::Exact(expected) => actual == expected,
            Expectation::Contains(expected) => actual.contains(expected.as_str()),
            Expectation::Liveness => !actual.is_empty(),
        }
    }
}

/// One candidate choice, written either as a bare index or as an object
#[derive(Deserialize)]
#[serde(untagged)]
enum SelectionRepr {
    Index(usize),
    Object {
        #[serde(alias = "choice_index")]
        index: usize,
    },
}

impl From<SelectionRepr> for usize {
    fn from(repr: SelectionRepr) -> Self {
        match repr {
            SelectionRepr::Index(index) | SelectionRepr::Object { index } => index,
        }
    }
}

/// Round as written in fixture files
///
/// Accepts either a nested `expect` or a flat `expected` + `policy` pair.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRound {
    #[serde(alias = "pinyin")]
    input: String,
    #[serde(default)]
    selections: Vec<SelectionRepr>,
    #[serde(default)]
    expect: Option<Expectation>,
    #[serde(default)]
    expected: Option<String>,
    #[serde(default)]
    policy: Option<MatchPolicy>,
}

impl TryFrom<RawRound> for Round {
    type Error = String;

    fn try_from(raw: RawRound) -> Result<Self, Self::Error> {
        let expect = match (raw.expect, raw.expected, raw.policy) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err("use either 'expect' or 'expected'/'policy', not both".to_string())
            }
            (Some(expect), None, None) => expect,
            (None, Some(s), None | Some(MatchPolicy::Exact)) => Expectation::Exact(s),
            (None, Some(s), Some(MatchPolicy::Contains)) => Expectation::Contains(s),
            (None, Some(_), Some(MatchPolicy::Liveness)) => {
                return Err("liveness rounds must not carry an expected value".to_string())
            }
            (None, None, None | Some(MatchPolicy::Liveness)) => Expectation::Liveness,
            (None, None, Some(policy)) => {
                return Err(format!("policy '{}' requires an expected value", policy))
            }
        };

        Ok(Round {
            input: raw.input,
            selections: raw.selections.into_iter().map(usize::from).collect(),
            expect,
        })
    }
}

/// One turn of interaction: input text, candidate choices, expectation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRound")]
pub struct Round {
    /// Romanized text submitted as one line
    pub input: String,
    /// Candidate indices chosen during this turn, in order
    pub selections: Vec<usize>,
    /// Expected committed text
    pub expect: Expectation,
}

impl Round {
    pub fn new(input: impl Into<String>, selections: Vec<usize>, expect: Expectation) -> Self {
        Self {
            input: input.into(),
            selections,
            expect,
        }
    }
}

/// A complete scripted conversation with the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Identifier, unique within a batch
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// What the scenario exercises
    #[serde(default)]
    pub description: String,
    /// Context line sent before the first round (sent even when empty)
    #[serde(default)]
    pub prefix: Option<String>,
    /// Per-scenario timeout override
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Marks a composition that is expected to exceed the engine's phrase limit
    #[serde(default)]
    pub over_long: bool,
    /// Full sentence the script composes, when only a fragment is asserted
    #[serde(default)]
    pub full_sentence: Option<String>,
    /// Turns, in submission order
    pub rounds: Vec<Round>,
}

impl Scenario {
    /// Total number of candidate selections across all rounds
    pub fn total_selections(&self) -> usize {
        self.rounds.iter().map(|r| r.selections.len()).sum()
    }

    /// Whether the scenario needs the longer multi-round timeout
    pub fn is_multi_step(&self) -> bool {
        self.rounds.len() > 1 || self.total_selections() > 1
    }

    /// Whether a non-empty conversational prefix is supplied
    pub fn has_prefix(&self) -> bool {
        self.prefix.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Character length of the longest composition this scenario asserts
    pub fn composition_len(&self) -> usize {
        let asserted = self
            .rounds
            .iter()
            .filter_map(|r| r.expect.value())
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0);
        let full = self
            .full_sentence
            .as_deref()
            .map(|s| s.chars().count())
            .unwrap_or(0);
        asserted.max(full)
    }

    /// Whether the composition reaches the given phrase length bound
    pub fn is_over_long(&self, bound: usize) -> bool {
        self.over_long || self.composition_len() >= bound
    }
}

/// Accept ids written as strings or integers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_nested_expect() {
        let round: Round = serde_yaml::from_str(
            r#"
input: nihao
selections: [0]
expect: { exact: "你好" }
"#,
        )
        .unwrap();
        assert_eq!(round.input, "nihao");
        assert_eq!(round.selections, vec![0]);
        assert_eq!(round.expect, Expectation::Exact("你好".to_string()));
    }

    #[test]
    fn test_round_flat_expected_defaults_to_exact() {
        let round: Round =
            serde_json::from_str(r#"{"pinyin": "nihao", "selections": [0], "expected": "你好"}"#)
                .unwrap();
        assert_eq!(round.expect.policy(), MatchPolicy::Exact);
    }

    #[test]
    fn test_round_flat_contains_policy() {
        let round: Round = serde_json::from_str(
            r#"{"input": "zhongguorenmin", "expected": "中国", "policy": "contains"}"#,
        )
        .unwrap();
        assert_eq!(round.expect, Expectation::Contains("中国".to_string()));
        assert!(round.selections.is_empty());
    }

    #[test]
    fn test_round_missing_expectation_is_liveness() {
        let round: Round = serde_json::from_str(r#"{"input": "xx", "expected": null}"#).unwrap();
        assert_eq!(round.expect, Expectation::Liveness);

        let round: Round = serde_yaml::from_str("input: xx\nexpect: liveness\n").unwrap();
        assert_eq!(round.expect, Expectation::Liveness);
    }

    #[test]
    fn test_round_selection_objects() {
        let round: Round = serde_json::from_str(
            r#"{"pinyin": "women", "selections": [{"choice_index": 2}, {"index": 0}], "expected": "我们"}"#,
        )
        .unwrap();
        assert_eq!(round.selections, vec![2, 0]);
    }

    #[test]
    fn test_round_conflicting_forms_rejected() {
        let result: Result<Round, _> = serde_json::from_str(
            r#"{"input": "a", "expect": {"exact": "啊"}, "expected": "啊"}"#,
        );
        assert!(result.is_err());

        let result: Result<Round, _> =
            serde_json::from_str(r#"{"input": "a", "policy": "contains"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_expectation_matching() {
        assert!(Expectation::Exact("你好".into()).is_satisfied_by("你好"));
        assert!(!Expectation::Exact("你好".into()).is_satisfied_by("你好吗"));
        assert!(Expectation::Contains("中国人民".into()).is_satisfied_by("我认为中国人民"));
        assert!(!Expectation::Contains("中国人民".into()).is_satisfied_by("中国"));
        assert!(Expectation::Liveness.is_satisfied_by("x"));
        assert!(!Expectation::Liveness.is_satisfied_by(""));
    }

    #[test]
    fn test_scenario_numeric_id_and_helpers() {
        let scenario: Scenario = serde_yaml::from_str(
            r#"
id: 7
description: "Mixed"
prefix: "我认为"
rounds:
  - input: zhongguorenmin
    selections: [0]
    expect: { contains: "中国人民" }
  - input: henqinlao
    selections: [0, 1]
"#,
        )
        .unwrap();
        assert_eq!(scenario.id, "7");
        assert!(scenario.has_prefix());
        assert!(scenario.is_multi_step());
        assert_eq!(scenario.total_selections(), 3);
        assert_eq!(scenario.composition_len(), 4);
        assert!(!scenario.is_over_long(16));
        assert!(scenario.is_over_long(4));
    }

    #[test]
    fn test_empty_prefix_is_not_a_prefix() {
        let scenario = Scenario {
            id: "1".into(),
            description: String::new(),
            prefix: Some(String::new()),
            timeout_secs: None,
            over_long: false,
            full_sentence: Some("一二三四五六七八九十一二三四五六七".into()),
            rounds: vec![Round::new("nihao", vec![0], Expectation::Contains("一二".into()))],
        };
        assert!(!scenario.has_prefix());
        assert!(!scenario.is_multi_step());
        assert!(scenario.is_over_long(16));
    }
}
