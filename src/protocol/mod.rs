//! Engine output parsing
//!
//! The engine mixes prompts, candidate listings and diagnostics into its
//! stdout. Only lines carrying the commit marker matter: the text after the
//! marker is one committed sentence. Everything else is ignored.

use crate::common::config::ProtocolConfig;
use crate::session::Transcript;

/// Committed sentences recovered from one transcript, in output order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResult {
    pub commits: Vec<String>,
    /// The engine reported that a composition exceeded its phrase limit
    pub too_long: bool,
}

impl ParsedResult {
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.commits.get(index).map(String::as_str)
    }
}

/// Stateless extractor for commit lines
#[derive(Debug, Clone)]
pub struct OutputParser {
    commit_marker: String,
    too_long_marker: String,
}

impl OutputParser {
    pub fn new(protocol: &ProtocolConfig) -> Self {
        Self {
            commit_marker: protocol.commit_marker.clone(),
            too_long_marker: protocol.too_long_marker.clone(),
        }
    }

    /// Parse a transcript's stdout
    pub fn parse(&self, transcript: &Transcript) -> ParsedResult {
        self.parse_text(&transcript.stdout)
    }

    /// Parse raw engine output
    pub fn parse_text(&self, text: &str) -> ParsedResult {
        let commits = text
            .lines()
            .filter_map(|line| self.commit_text(line))
            .map(str::to_string)
            .collect();

        let too_long = !self.too_long_marker.is_empty() && text.contains(&self.too_long_marker);

        ParsedResult { commits, too_long }
    }

    /// Extract the committed text from a single line, if it is a commit line
    ///
    /// Prompts are printed without a trailing newline, so the marker can
    /// appear mid-line (`choose:sentence:你好`).
    pub fn commit_text<'a>(&self, line: &'a str) -> Option<&'a str> {
        let start = line.find(&self.commit_marker)?;
        Some(line[start + self.commit_marker.len()..].trim())
    }
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new(&ProtocolConfig::default())
    }
}
