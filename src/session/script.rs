//! Input script construction
//!
//! The engine reads one token per line: the optional prefix, then each
//! round's input followed by its selection indices, then the quit command.

use crate::fixture::Scenario;

/// Build the ordered list of script lines for a scenario
pub fn script_lines<'a>(scenario: &'a Scenario, quit_command: &'a str) -> Vec<std::borrow::Cow<'a, str>> {
    use std::borrow::Cow;

    let mut lines: Vec<Cow<'a, str>> = Vec::with_capacity(2 + scenario.rounds.len() * 2);

    if let Some(prefix) = &scenario.prefix {
        lines.push(Cow::Borrowed(prefix.as_str()));
    }

    for round in &scenario.rounds {
        lines.push(Cow::Borrowed(round.input.as_str()));
        lines.extend(round.selections.iter().map(|s| Cow::Owned(s.to_string())));
    }

    lines.push(Cow::Borrowed(quit_command));
    lines
}

/// Flatten a scenario into the text written to the engine's stdin
pub fn build_script(scenario: &Scenario, quit_command: &str) -> String {
    let mut script = script_lines(scenario, quit_command).join("\n");
    script.push('\n');
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{Expectation, Round};

    fn scenario(prefix: Option<&str>, rounds: Vec<Round>) -> Scenario {
        Scenario {
            id: "s".into(),
            description: String::new(),
            prefix: prefix.map(str::to_string),
            timeout_secs: None,
            over_long: false,
            full_sentence: None,
            rounds,
        }
    }

    #[test]
    fn test_single_round_with_empty_prefix() {
        let s = scenario(
            Some(""),
            vec![Round::new("nihao", vec![0], Expectation::Contains("你好".into()))],
        );
        assert_eq!(build_script(&s, "quit"), "\nnihao\n0\nquit\n");
    }

    #[test]
    fn test_multi_round_without_prefix() {
        let s = scenario(
            None,
            vec![
                Round::new("zhongguo", vec![1, 0], Expectation::Liveness),
                Round::new("renmin", vec![], Expectation::Liveness),
            ],
        );
        assert_eq!(build_script(&s, "quit"), "zhongguo\n1\n0\nrenmin\nquit\n");
    }

    #[test]
    fn test_custom_quit_command() {
        let s = scenario(Some("我认为"), vec![]);
        assert_eq!(build_script(&s, ":q"), "我认为\n:q\n");
    }
}
