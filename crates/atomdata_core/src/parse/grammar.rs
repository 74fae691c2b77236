//! Declarative field grammar for `Label = value` text entries.
//!
//! # Responsibility
//! - Split preformatted text into entries (line groups separated by blank lines).
//! - Tag each recognized line with the field name declared by a `FieldRule`.
//!
//! # Invariants
//! - Scanning never fails as a whole; an entry that misses a required field is
//!   reported as skipped and scanning continues.
//! - Field values are trimmed; an empty value counts as absent.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

static FIELD_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<label>[A-Za-z][A-Za-z ]*?)\s*=\s*(?P<value>.*?)\s*$")
        .expect("valid field line regex")
});

/// One named field extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// Stable column name used by consumers.
    pub name: &'static str,
    /// Label as printed by the source, matched case-insensitively.
    pub label: &'static str,
    pub required: bool,
}

/// Fixed set of field rules applied to every entry.
#[derive(Debug, Clone, Copy)]
pub struct FieldGrammar {
    rules: &'static [FieldRule],
}

/// Field name to raw value for one matched entry.
pub type TaggedEntry = BTreeMap<&'static str, String>;

/// Why an entry was dropped during parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MissingField(&'static str),
    InvalidValue { field: &'static str, value: String },
    InvalidInterval { lower: f64, upper: f64 },
    DuplicateKey { atomic_number: u32, mass_number: u32 },
}

/// A malformed entry that was recovered locally by dropping it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseSkip {
    /// 1-based line where the entry starts.
    pub line: usize,
    pub reason: SkipReason,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing field `{field}`"),
            Self::InvalidValue { field, value } => {
                write!(f, "invalid value `{value}` for field `{field}`")
            }
            Self::InvalidInterval { lower, upper } => {
                write!(f, "invalid interval [{lower}, {upper}]")
            }
            Self::DuplicateKey {
                atomic_number,
                mass_number,
            } => write!(
                f,
                "duplicate entry for atomic_number={atomic_number} mass_number={mass_number}"
            ),
        }
    }
}

impl Display for ParseSkip {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// Result of matching one line group against the grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedEntry {
    /// 1-based line where the entry starts.
    pub line: usize,
    pub fields: Result<TaggedEntry, SkipReason>,
}

impl FieldGrammar {
    pub const fn new(rules: &'static [FieldRule]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'static [FieldRule] {
        self.rules
    }

    /// Scans all entries of `text`.
    ///
    /// Line groups that contain no recognized field at all (headers, footers)
    /// are dropped silently; groups with some but not all required fields are
    /// returned as skipped.
    pub fn scan(&self, text: &str) -> Vec<ScannedEntry> {
        let mut entries = Vec::new();
        let mut group: Vec<&str> = Vec::new();
        let mut group_start = 1;

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                if !group.is_empty() {
                    entries.extend(self.match_group(group_start, &group));
                    group.clear();
                }
                continue;
            }
            if group.is_empty() {
                group_start = index + 1;
            }
            group.push(line);
        }
        if !group.is_empty() {
            entries.extend(self.match_group(group_start, &group));
        }

        entries
    }

    fn match_group(&self, line: usize, lines: &[&str]) -> Option<ScannedEntry> {
        let mut fields = TaggedEntry::new();
        let mut recognized = false;

        for text in lines {
            let Some(captures) = FIELD_LINE_RE.captures(text) else {
                continue;
            };
            let Some(rule) = self.rule_for_label(&captures["label"]) else {
                continue;
            };
            recognized = true;
            let value = captures["value"].trim();
            if !value.is_empty() {
                fields.entry(rule.name).or_insert_with(|| value.to_string());
            }
        }

        if !recognized {
            return None;
        }

        let missing = self
            .rules
            .iter()
            .find(|rule| rule.required && !fields.contains_key(rule.name));
        Some(ScannedEntry {
            line,
            fields: match missing {
                Some(rule) => Err(SkipReason::MissingField(rule.name)),
                None => Ok(fields),
            },
        })
    }

    fn rule_for_label(&self, label: &str) -> Option<&'static FieldRule> {
        self.rules
            .iter()
            .find(|rule| rule.label.eq_ignore_ascii_case(label.trim()))
    }
}
