//! Per-element atomic weight derivation.
//!
//! # Responsibility
//! - Collapse the isotope table to one record per element.
//! - Resolve direct, interval and stable-mass-number weights into a uniform
//!   `(value, std_dev)` pair.
//!
//! # Invariants
//! - Every element of the input table appears exactly once in the output.
//! - A stable-mass-number reference to a missing isotope row is an error, not
//!   a null weight.

use crate::model::element::AtomicNumber;
use crate::model::quantity::UncertainValue;
use crate::parse::compositions::{AtomicWeightKind, IsotopeRow, RowTable};
use log::{error, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type NormalizeResult<T> = Result<T, NormalizeError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// Element weight points at an isotope row the table does not contain.
    UnresolvedReference {
        atomic_number: AtomicNumber,
        mass_number: u32,
    },
}

impl Display for NormalizeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedReference {
                atomic_number,
                mass_number,
            } => write!(
                f,
                "atomic weight of element {atomic_number} references missing isotope with mass number {mass_number}"
            ),
        }
    }
}

impl Error for NormalizeError {}

/// Resolved atomic weight of one element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AtomicWeightRecord {
    pub atomic_number: AtomicNumber,
    /// `None` when the source states no weight for the element.
    pub value: Option<f64>,
    pub std_dev: Option<f64>,
}

impl AtomicWeightRecord {
    fn resolved(atomic_number: AtomicNumber, value: UncertainValue) -> Self {
        Self {
            atomic_number,
            value: Some(value.nominal_value),
            std_dev: value.std_dev,
        }
    }

    fn unresolved(atomic_number: AtomicNumber) -> Self {
        Self {
            atomic_number,
            value: None,
            std_dev: None,
        }
    }
}

/// One atomic weight record per element, ordered by atomic number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomicWeightTable {
    records: BTreeMap<AtomicNumber, AtomicWeightRecord>,
}

impl AtomicWeightTable {
    pub fn get(&self, atomic_number: AtomicNumber) -> Option<&AtomicWeightRecord> {
        self.records.get(&atomic_number)
    }

    pub fn records(&self) -> impl Iterator<Item = &AtomicWeightRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Serialize for AtomicWeightTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.records.values())
    }
}

impl FromIterator<AtomicWeightRecord> for AtomicWeightTable {
    /// Later records for the same element replace earlier ones.
    fn from_iter<I: IntoIterator<Item = AtomicWeightRecord>>(iter: I) -> Self {
        Self {
            records: iter
                .into_iter()
                .map(|record| (record.atomic_number, record))
                .collect(),
        }
    }
}

/// Derives the per-element weight table from the isotope table.
///
/// The first row of each element (lowest mass number) supplies the weight
/// fields; every isotope row of an element repeats the same element data.
///
/// # Errors
/// - `UnresolvedReference` when a stable-mass-number weight names an isotope
///   that is absent from `table`.
pub fn prepare_atomic_weights(table: &RowTable) -> NormalizeResult<AtomicWeightTable> {
    let mut records = BTreeMap::new();

    for row in table.rows() {
        if records.contains_key(&row.atomic_number) {
            continue;
        }
        let record = resolve_atomic_weight(table, row).inspect_err(|err| {
            error!(
                "event=atomic_weights_normalize module=normalize status=error atomic_number={} error={}",
                row.atomic_number, err
            );
        })?;
        records.insert(row.atomic_number, record);
    }

    let resolved = records.values().filter(|r| r.value.is_some()).count();
    info!(
        "event=atomic_weights_normalize module=normalize status=ok elements={} resolved={}",
        records.len(),
        resolved
    );
    Ok(AtomicWeightTable { records })
}

fn resolve_atomic_weight(table: &RowTable, row: &IsotopeRow) -> NormalizeResult<AtomicWeightRecord> {
    let atomic_number = row.atomic_number;
    let record = match row.atomic_weight {
        Some(AtomicWeightKind::Direct(value)) => AtomicWeightRecord::resolved(atomic_number, value),
        Some(AtomicWeightKind::Interval(interval)) => {
            AtomicWeightRecord::resolved(atomic_number, interval.to_uncertain_value())
        }
        Some(AtomicWeightKind::StableMassNumber { mass_number }) => {
            let isotope = table.get(atomic_number, mass_number).ok_or(
                NormalizeError::UnresolvedReference {
                    atomic_number,
                    mass_number,
                },
            )?;
            AtomicWeightRecord::resolved(atomic_number, isotope.atomic_mass)
        }
        None => AtomicWeightRecord::unresolved(atomic_number),
    };
    Ok(record)
}
