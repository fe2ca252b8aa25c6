//! Text-to-record converters for CLI output.
//!
//! Every parser follows the same shape: split the output into lines, drop
//! noise lines (headers, rules, prompts, command echoes, blanks), run an
//! ordered set of field extractors over each remaining line, and collect the
//! result into a [`ParseReport`]. A line whose required field does not match,
//! or whose number does not convert, becomes a [`FieldParseError`] in the
//! report. It never stops the rest of the output from being parsed.

use std::collections::BTreeMap;

use regex::Regex;
use thiserror::Error;

pub mod environment;
pub mod system;

/// One line that could not be turned into a record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: cannot extract {field}: {reason} (\"{content}\")")]
pub struct FieldParseError {
    /// 1-based line number in the parsed text.
    pub line: usize,
    pub field: &'static str,
    pub reason: String,
    pub content: String,
}

impl FieldParseError {
    pub fn new(line: usize, content: &str, field: &'static str, reason: impl Into<String>) -> Self {
        FieldParseError {
            line,
            field,
            reason: reason.into(),
            content: content.trim().to_string(),
        }
    }
}

/// Failures that make a whole section unusable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A structural marker the parser anchors on is missing.
    #[error("section '{section}' not found in output")]
    SectionNotFound { section: &'static str },

    /// Nothing survived parsing.
    #[error("no records produced ({rejected} line(s) rejected)")]
    NoRecords { rejected: usize },
}

/// Parsed records keyed by slot/sensor identifier, plus the rejected lines.
///
/// Keys are kept sorted so that emission order is stable between scrapes.
/// Inserting an existing key replaces the earlier record.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseReport<R> {
    pub records: BTreeMap<String, R>,
    pub failures: Vec<FieldParseError>,
}

impl<R> Default for ParseReport<R> {
    fn default() -> Self {
        ParseReport {
            records: BTreeMap::new(),
            failures: Vec::new(),
        }
    }
}

impl<R> ParseReport<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, record: R) {
        self.records.insert(key.into(), record);
    }

    pub fn reject(&mut self, failure: FieldParseError) {
        self.failures.push(failure);
    }

    /// Stores the outcome of parsing one line.
    pub fn push_line(&mut self, outcome: Result<(String, R), FieldParseError>) {
        match outcome {
            Ok((key, record)) => self.insert(key, record),
            Err(failure) => self.reject(failure),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&R> {
        self.records.get(key)
    }

    /// Converts the record type, keeping keys and failures.
    pub fn map<T>(self, f: impl Fn(R) -> T) -> ParseReport<T> {
        ParseReport {
            records: self.records.into_iter().map(|(k, r)| (k, f(r))).collect(),
            failures: self.failures,
        }
    }
}

/// Lines worth looking at: 1-based line number and text with trailing
/// whitespace (including `\r`) removed. Blank lines and lines containing any
/// of the `noise` substrings are skipped.
pub(crate) fn candidate_lines<'a>(
    text: &'a str,
    noise: &'a [&'a str],
) -> impl Iterator<Item = (usize, &'a str)> + 'a {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end()))
        .filter(|(_, line)| !line.trim().is_empty())
        .filter(move |(_, line)| !noise.iter().any(|marker| line.contains(marker)))
}

/// First capture group of `re` in `line`, or a `FieldParseError` naming `field`.
pub(crate) fn capture<'t>(
    re: &Regex,
    line_no: usize,
    line: &'t str,
    field: &'static str,
) -> Result<&'t str, FieldParseError> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| FieldParseError::new(line_no, line, field, "pattern did not match"))
}

/// Whole match of `re` in `line`, or a `FieldParseError` naming `field`.
pub(crate) fn find<'t>(
    re: &Regex,
    line_no: usize,
    line: &'t str,
    field: &'static str,
) -> Result<&'t str, FieldParseError> {
    re.find(line)
        .map(|m| m.as_str())
        .ok_or_else(|| FieldParseError::new(line_no, line, field, "pattern did not match"))
}

/// Parses a decimal that may carry a trailing unit such as `" C"`, `" kB"`
/// or `"%"`.
pub fn parse_decimal(raw: &str) -> Result<f64, String> {
    let number = raw
        .trim()
        .trim_end_matches(|c: char| c.is_alphabetic() || c == '%' || c.is_whitespace());
    number
        .parse::<f64>()
        .map_err(|e| format!("'{}' is not a number: {}", raw.trim(), e))
}

/// [`parse_decimal`] with the failure attached to a line and field.
pub(crate) fn decimal_field(
    raw: &str,
    line_no: usize,
    line: &str,
    field: &'static str,
) -> Result<f64, FieldParseError> {
    parse_decimal(raw).map_err(|reason| FieldParseError::new(line_no, line, field, reason))
}
