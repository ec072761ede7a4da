//! Pattern scan over a markdown document.
//!
//! Each pattern is reported at most once, at its first matching line, with
//! one line of context on either side. The report keeps pattern declaration
//! order regardless of where in the document the matches are.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

/// A named, case-insensitive line pattern.
#[derive(Debug, Clone)]
pub struct ConflictPattern {
    /// Stable identifier used in reports and superseded markers.
    pub id: &'static str,
    /// Short human-readable description for prompts.
    pub label: &'static str,
    regex: Regex,
}

impl ConflictPattern {
    /// Compile a pattern. Matching is case-insensitive and per line.
    pub fn new(id: &'static str, label: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { id, label, regex })
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

/// Pattern id for a managed block left by an earlier setup run.
pub const PREVIOUS_SETUP: &str = "previous_setup";

/// The built-in patterns, in evaluation order.
///
/// # Panics
///
/// Panics on first use if one of the literal patterns below fails to
/// compile, which would be a programming error caught by the unit tests.
pub static PATTERNS: LazyLock<Vec<ConflictPattern>> = LazyLock::new(|| {
    [
        (
            PREVIOUS_SETUP,
            "block from an earlier rigger setup",
            r"^\s*<!--\s*rigger:begin\b",
        ),
        (
            "model_tiering",
            "model tiering section",
            r"^\s*#{1,6}\s*model\s+tiering\b",
        ),
        (
            "agent_delegation",
            "agent delegation / routing section",
            r"^\s*#{1,6}\s*(sub)?agent\s+(delegation|routing|catalog)\b",
        ),
        (
            "orchestration",
            "orchestration section",
            r"^\s*#{1,6}\s*orchestration\b",
        ),
        (
            "verification_policy",
            "verification / testing policy section",
            r"^\s*#{1,6}\s*(verification|testing)\s+(policy|requirements)\b",
        ),
    ]
    .into_iter()
    .map(|(id, label, src)| {
        ConflictPattern::new(id, label, src).expect("built-in conflict pattern is invalid")
    })
    .collect()
});

/// Whether `line` opens a managed block. Uses the same pattern as the
/// [`PREVIOUS_SETUP`] conflict, so detection and block lookup agree.
pub fn is_block_begin(line: &str) -> bool {
    PATTERNS
        .iter()
        .find(|p| p.id == PREVIOUS_SETUP)
        .is_some_and(|p| p.is_match(line))
}

/// One pattern's first occurrence in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictMatch {
    pub pattern_id: String,
    /// 1-based line number of the matching line.
    pub line: usize,
    /// 1-based first line of the context window.
    pub start_line: usize,
    /// 1-based last line of the context window (inclusive).
    pub end_line: usize,
    /// Lines `start_line..=end_line`, without line terminators.
    pub context_lines: Vec<String>,
}

/// Ordered conflicts found in one document. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub matches: Vec<ConflictMatch>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConflictMatch> {
        self.matches.iter()
    }

    pub fn get(&self, pattern_id: &str) -> Option<&ConflictMatch> {
        self.matches.iter().find(|m| m.pattern_id == pattern_id)
    }

    /// Whether an earlier setup run already left a managed block.
    pub fn has_previous_setup(&self) -> bool {
        self.get(PREVIOUS_SETUP).is_some()
    }
}

/// Scan `document` with the built-in [`PATTERNS`].
pub fn detect(document: &str) -> ConflictReport {
    detect_with(document, &PATTERNS)
}

/// Scan `document` with an explicit pattern list.
pub fn detect_with(document: &str, patterns: &[ConflictPattern]) -> ConflictReport {
    let lines: Vec<&str> = document.lines().collect();

    let matches = patterns
        .iter()
        .filter_map(|pattern| {
            let idx = lines.iter().position(|line| pattern.is_match(line))?;
            let start = idx.saturating_sub(1);
            let end = (idx + 1).min(lines.len() - 1);
            Some(ConflictMatch {
                pattern_id: pattern.id.to_string(),
                line: idx + 1,
                start_line: start + 1,
                end_line: end + 1,
                context_lines: lines[start..=end].iter().map(|l| l.to_string()).collect(),
            })
        })
        .collect();

    ConflictReport { matches }
}
