//! Line-oriented parser for tagged dialogue scripts.
//!
//! A script is plain text with one dialogue line per physical line. Each line
//! may start with any number of `[KEY=VALUE]` tag blocks:
//!
//! ```text
//! [NAME=Bob] Hi there
//! [NAME=Amy][SPEAKERSPRITE=happy] Oh, hello!
//! ```
//!
//! Parsing never fails. Problems are reported as [`ParseDiagnostic`]s (and
//! logged), and the offending line is either adjusted or dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::line::{DialogueLine, UNKNOWN_SPEAKER};

const NAME_KEY: &str = "NAME";
const SPRITE_KEY: &str = "SPEAKERSPRITE";

/// Result of parsing a script: the usable lines plus everything that went wrong.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedScript {
    pub lines: Vec<DialogueLine>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParsedScript {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity() == Severity::Error)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// A recoverable problem found while parsing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseDiagnostic {
    /// 1-based index among the non-empty physical lines of the script.
    pub line: usize,
    pub kind: ParseDiagnosticKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseDiagnosticKind {
    /// A `[` with no closing `]`; the rest of the line is kept as text.
    UnterminatedTag,
    /// A tag block without `=`; the block is ignored.
    MalformedTag { inside: String },
    /// A tag block like `[=value]`; the block is ignored.
    EmptyKey,
    /// Tags but no text; the line is dropped.
    MissingText,
    /// No `NAME` tag; the line uses [`UNKNOWN_SPEAKER`].
    MissingSpeaker,
}

impl ParseDiagnostic {
    pub fn severity(&self) -> Severity {
        match self.kind {
            ParseDiagnosticKind::UnterminatedTag
            | ParseDiagnosticKind::MalformedTag { .. }
            | ParseDiagnosticKind::EmptyKey => Severity::Error,
            ParseDiagnosticKind::MissingText | ParseDiagnosticKind::MissingSpeaker => {
                Severity::Warning
            }
        }
    }

    pub fn message(&self) -> String {
        match &self.kind {
            ParseDiagnosticKind::UnterminatedTag => {
                format!("line {}: missing closing ']' for tag", self.line)
            }
            ParseDiagnosticKind::MalformedTag { inside } => format!(
                "line {}: could not parse tag '{inside}', tags must look like [NAME=Player] or [SPEAKERSPRITE=happy]",
                self.line
            ),
            ParseDiagnosticKind::EmptyKey => format!("line {}: empty tag key", self.line),
            ParseDiagnosticKind::MissingText => {
                format!("line {}: has tags but no text, skipping", self.line)
            }
            ParseDiagnosticKind::MissingSpeaker => format!(
                "line {}: has no [NAME=...] tag, using '{UNKNOWN_SPEAKER}'",
                self.line
            ),
        }
    }
}

/// Tags collected from the front of one line. Keys compare case-insensitively
/// and a repeated key overwrites the earlier value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagMap {
    entries: BTreeMap<String, String>,
}

impl TagMap {
    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_uppercase(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&key.to_uppercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn into_line(mut self, text: &str) -> (DialogueLine, bool) {
        let speaker = self.entries.remove(NAME_KEY);
        let sprite_id = self.entries.remove(SPRITE_KEY);
        let missing_speaker = speaker.is_none();
        let line = DialogueLine {
            speaker_id: speaker.unwrap_or_else(|| UNKNOWN_SPEAKER.to_string()),
            sprite_id,
            text: text.to_string(),
            extra_tags: self.entries,
        };
        (line, missing_speaker)
    }
}

/// Parses a script, logging diagnostics and returning only the lines.
pub fn parse(source: &str) -> Vec<DialogueLine> {
    parse_with_diagnostics(source).lines
}

/// Parses a script and returns both the lines and the diagnostics.
pub fn parse_with_diagnostics(source: &str) -> ParsedScript {
    let mut parsed = ParsedScript::default();

    let physical = source.split(['\r', '\n']).filter(|raw| !raw.is_empty());
    for (idx, raw) in physical.enumerate() {
        let line_number = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let mut report = |kind: ParseDiagnosticKind| {
            let diagnostic = ParseDiagnostic {
                line: line_number,
                kind,
            };
            log_diagnostic(&diagnostic, raw);
            parsed.diagnostics.push(diagnostic);
        };

        let (tags, cursor) = scan_tags(line, &mut report);
        let text = line[cursor..].trim_start();
        if text.is_empty() {
            report(ParseDiagnosticKind::MissingText);
            continue;
        }

        let (dialogue_line, missing_speaker) = tags.into_line(text);
        if missing_speaker {
            report(ParseDiagnosticKind::MissingSpeaker);
        }
        parsed.lines.push(dialogue_line);
    }

    parsed
}

/// Consumes the leading tag blocks of a trimmed line. Returns the collected
/// tags and the byte offset where the text begins.
fn scan_tags(line: &str, report: &mut impl FnMut(ParseDiagnosticKind)) -> (TagMap, usize) {
    let mut tags = TagMap::default();
    let mut cursor = 0usize;

    while line[cursor..].starts_with('[') {
        let open = cursor;
        let Some(close_offset) = line[open + 1..].find(']') else {
            report(ParseDiagnosticKind::UnterminatedTag);
            break;
        };
        let close = open + 1 + close_offset;
        let inside = &line[open + 1..close];

        match inside.split_once('=') {
            None => report(ParseDiagnosticKind::MalformedTag {
                inside: inside.to_string(),
            }),
            Some((key, value)) => {
                let key = key.trim();
                if key.is_empty() {
                    report(ParseDiagnosticKind::EmptyKey);
                } else {
                    tags.insert(key, value.trim());
                }
            }
        }

        cursor = close + 1;
        let rest = &line[cursor..];
        cursor += rest.len() - rest.trim_start().len();
    }

    (tags, cursor)
}

fn log_diagnostic(diagnostic: &ParseDiagnostic, raw: &str) {
    match diagnostic.severity() {
        Severity::Error => error!(
            line = diagnostic.line,
            raw_line = raw,
            "{}",
            diagnostic.message()
        ),
        Severity::Warning => warn!(line = diagnostic.line, "{}", diagnostic.message()),
    }
}

#[cfg(test)]
#[path = "tests/parser_tests.rs"]
mod tests;
