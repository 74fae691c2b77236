//! Parser for the NIST Atomic Weights and Isotopic Compositions text table.
//!
//! # Responsibility
//! - Tag `Label = value` entries with the compositions grammar.
//! - Convert tagged fields into typed `IsotopeRow`s indexed by
//!   `(atomic_number, mass_number)`.
//!
//! # Invariants
//! - Row keys are unique; the first entry for a key wins.
//! - Malformed entries are skipped and recorded, never fatal.
//! - A malformed optional isotopic composition is logged and read as absent.
//! - Parsing is pure: the same text always yields an equal table.

use crate::model::element::AtomicNumber;
use crate::model::quantity::{parse_uncertain, Interval, UncertainValue};
use crate::parse::grammar::{FieldGrammar, FieldRule, ParseSkip, SkipReason, TaggedEntry};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Instant;

pub const ATOMIC_NUMBER_FIELD: &str = "atomic_number";
pub const ATOMIC_SYMBOL_FIELD: &str = "atomic_symbol";
pub const MASS_NUMBER_FIELD: &str = "mass_number";
pub const ATOMIC_MASS_FIELD: &str = "atomic_mass";
pub const ISOTOPIC_COMPOSITION_FIELD: &str = "isotopic_composition";
pub const ATOMIC_WEIGHT_FIELD: &str = "atomic_weight";
pub const NOTES_FIELD: &str = "notes";

const COMPOSITIONS_RULES: &[FieldRule] = &[
    FieldRule {
        name: ATOMIC_NUMBER_FIELD,
        label: "Atomic Number",
        required: true,
    },
    FieldRule {
        name: ATOMIC_SYMBOL_FIELD,
        label: "Atomic Symbol",
        required: true,
    },
    FieldRule {
        name: MASS_NUMBER_FIELD,
        label: "Mass Number",
        required: true,
    },
    FieldRule {
        name: ATOMIC_MASS_FIELD,
        label: "Relative Atomic Mass",
        required: true,
    },
    FieldRule {
        name: ISOTOPIC_COMPOSITION_FIELD,
        label: "Isotopic Composition",
        required: false,
    },
    FieldRule {
        name: ATOMIC_WEIGHT_FIELD,
        label: "Standard Atomic Weight",
        required: false,
    },
    FieldRule {
        name: NOTES_FIELD,
        label: "Notes",
        required: false,
    },
];

/// Grammar for the `ascii2` rendering of the compositions table.
pub const COMPOSITIONS_GRAMMAR: FieldGrammar = FieldGrammar::new(COMPOSITIONS_RULES);

static WEIGHT_INTERVAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[\s*(?P<lower>[0-9.eE+-]+)\s*,\s*(?P<upper>[0-9.eE+-]+)\s*\]$")
        .expect("valid weight interval regex")
});
static WEIGHT_STABLE_MASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\s*(?P<mass>\d+)\s*\]$").expect("valid stable mass regex"));

/// How an element's standard atomic weight is stated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AtomicWeightKind {
    /// Value with concise uncertainty, e.g. `4.002602(2)`.
    Direct(UncertainValue),
    /// Bounded range, e.g. `[1.00784,1.00811]`.
    Interval(Interval),
    /// No stable isotope: use the mass of the referenced isotope, e.g. `[98]`.
    StableMassNumber { mass_number: u32 },
}

/// One isotope entry of the compositions table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsotopeRow {
    pub atomic_number: AtomicNumber,
    pub symbol: String,
    pub mass_number: u32,
    pub atomic_mass: UncertainValue,
    /// Mass marked `#`: derived from systematics rather than measured.
    pub atomic_mass_theoretical: bool,
    pub isotopic_composition: Option<UncertainValue>,
    /// Element-level data, repeated on every isotope row of the element.
    pub atomic_weight: Option<AtomicWeightKind>,
    pub notes: Vec<String>,
}

/// Isotope rows keyed by `(atomic_number, mass_number)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowTable {
    #[serde(serialize_with = "serialize_rows")]
    rows: BTreeMap<(AtomicNumber, u32), IsotopeRow>,
    #[serde(skip)]
    skipped: Vec<ParseSkip>,
}

impl RowTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row; returns the row back when its key is already taken.
    pub fn insert(&mut self, row: IsotopeRow) -> Result<(), IsotopeRow> {
        let key = (row.atomic_number, row.mass_number);
        if self.rows.contains_key(&key) {
            return Err(row);
        }
        self.rows.insert(key, row);
        Ok(())
    }

    pub fn get(&self, atomic_number: AtomicNumber, mass_number: u32) -> Option<&IsotopeRow> {
        self.rows.get(&(atomic_number, mass_number))
    }

    /// Rows in key order.
    pub fn rows(&self) -> impl Iterator<Item = &IsotopeRow> {
        self.rows.values()
    }

    /// Rows of one element in mass-number order.
    pub fn element_rows(&self, atomic_number: AtomicNumber) -> impl Iterator<Item = &IsotopeRow> {
        self.rows
            .range((atomic_number, 0)..=(atomic_number, u32::MAX))
            .map(|(_, row)| row)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Entries dropped while parsing.
    pub fn skipped(&self) -> &[ParseSkip] {
        &self.skipped
    }
}

/// Parses preformatted compositions text into a `RowTable`.
///
/// # Side effects
/// - Emits one `compositions_parse` event and a warning per skipped entry.
pub fn parse_compositions(text: &str) -> RowTable {
    let started_at = Instant::now();
    let mut table = RowTable::new();

    for entry in COMPOSITIONS_GRAMMAR.scan(text) {
        let parsed = entry.fields.and_then(|fields| isotope_row_from_fields(&fields));
        let outcome = parsed.and_then(|row| {
            table.insert(row).map_err(|row| SkipReason::DuplicateKey {
                atomic_number: row.atomic_number,
                mass_number: row.mass_number,
            })
        });

        if let Err(reason) = outcome {
            warn!(
                "event=compositions_parse_skip module=parse status=skipped line={} reason={}",
                entry.line, reason
            );
            table.skipped.push(ParseSkip {
                line: entry.line,
                reason,
            });
        }
    }

    info!(
        "event=compositions_parse module=parse status=ok rows={} skipped={} duration_ms={}",
        table.len(),
        table.skipped.len(),
        started_at.elapsed().as_millis()
    );
    table
}

fn serialize_rows<S: Serializer>(
    rows: &BTreeMap<(AtomicNumber, u32), IsotopeRow>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(rows.values())
}

fn isotope_row_from_fields(fields: &TaggedEntry) -> Result<IsotopeRow, SkipReason> {
    let atomic_number = parse_integer(fields, ATOMIC_NUMBER_FIELD)?;
    let mass_number = parse_integer(fields, MASS_NUMBER_FIELD)?;
    let symbol = required(fields, ATOMIC_SYMBOL_FIELD)?.to_string();

    let mass_text = required(fields, ATOMIC_MASS_FIELD)?;
    let (mass_text, atomic_mass_theoretical) = match mass_text.strip_suffix('#') {
        Some(stripped) => (stripped.trim_end(), true),
        None => (mass_text, false),
    };
    let atomic_mass =
        parse_uncertain(mass_text).ok_or_else(|| invalid(ATOMIC_MASS_FIELD, mass_text))?;

    // Unparsable composition is dropped; the row itself is kept.
    let isotopic_composition = fields.get(ISOTOPIC_COMPOSITION_FIELD).and_then(|text| {
        let value = parse_uncertain(text);
        if value.is_none() {
            warn!(
                "event=compositions_parse_field module=parse status=ignored atomic_number={atomic_number} mass_number={mass_number} field={ISOTOPIC_COMPOSITION_FIELD} value={text}"
            );
        }
        value
    });

    let atomic_weight = fields
        .get(ATOMIC_WEIGHT_FIELD)
        .map(|text| parse_atomic_weight(text.as_str()))
        .transpose()?;

    let notes = fields
        .get(NOTES_FIELD)
        .map(|text| {
            text.split(',')
                .map(str::trim)
                .filter(|note| !note.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(IsotopeRow {
        atomic_number,
        symbol,
        mass_number,
        atomic_mass,
        atomic_mass_theoretical,
        isotopic_composition,
        atomic_weight,
        notes,
    })
}

/// Parses the `Standard Atomic Weight` field into its kind.
pub fn parse_atomic_weight(text: &str) -> Result<AtomicWeightKind, SkipReason> {
    let text = text.trim();

    if let Some(captures) = WEIGHT_INTERVAL_RE.captures(text) {
        let bound = |name: &str| {
            captures[name]
                .parse::<f64>()
                .map_err(|_| invalid(ATOMIC_WEIGHT_FIELD, text))
        };
        let (lower, upper) = (bound("lower")?, bound("upper")?);
        return Interval::new(lower, upper)
            .map(AtomicWeightKind::Interval)
            .map_err(|err| SkipReason::InvalidInterval {
                lower: err.lower,
                upper: err.upper,
            });
    }

    if let Some(captures) = WEIGHT_STABLE_MASS_RE.captures(text) {
        let mass_number = captures["mass"]
            .parse::<u32>()
            .map_err(|_| invalid(ATOMIC_WEIGHT_FIELD, text))?;
        return Ok(AtomicWeightKind::StableMassNumber { mass_number });
    }

    parse_uncertain(text)
        .map(AtomicWeightKind::Direct)
        .ok_or_else(|| invalid(ATOMIC_WEIGHT_FIELD, text))
}

fn required<'a>(fields: &'a TaggedEntry, field: &'static str) -> Result<&'a str, SkipReason> {
    fields
        .get(field)
        .map(String::as_str)
        .ok_or(SkipReason::MissingField(field))
}

fn parse_integer(fields: &TaggedEntry, field: &'static str) -> Result<u32, SkipReason> {
    let text = required(fields, field)?;
    text.parse::<u32>().map_err(|_| invalid(field, text))
}

fn invalid(field: &'static str, value: &str) -> SkipReason {
    SkipReason::InvalidValue {
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_atomic_weight, AtomicWeightKind};
    use crate::model::quantity::{Interval, UncertainValue};
    use crate::parse::grammar::SkipReason;

    #[test]
    fn atomic_weight_notations_map_to_kinds() {
        assert_eq!(
            parse_atomic_weight("[1.00784,1.00811]"),
            Ok(AtomicWeightKind::Interval(
                Interval::new(1.00784, 1.00811).unwrap()
            ))
        );
        assert_eq!(
            parse_atomic_weight("[98]"),
            Ok(AtomicWeightKind::StableMassNumber { mass_number: 98 })
        );
        assert_eq!(
            parse_atomic_weight("6.94"),
            Ok(AtomicWeightKind::Direct(UncertainValue::exact(6.94)))
        );
        assert!(matches!(
            parse_atomic_weight("4.002602(2)"),
            Ok(AtomicWeightKind::Direct(UncertainValue {
                std_dev: Some(_),
                ..
            }))
        ));
    }

    #[test]
    fn reversed_weight_interval_is_a_skip() {
        assert_eq!(
            parse_atomic_weight("[2.0, 1.0]"),
            Err(SkipReason::InvalidInterval {
                lower: 2.0,
                upper: 1.0
            })
        );
        assert!(matches!(
            parse_atomic_weight("[abc]"),
            Err(SkipReason::InvalidValue { .. })
        ));
    }
}
