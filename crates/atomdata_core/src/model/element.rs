//! Persisted reference-data records.
//!
//! # Responsibility
//! - Define the stored shapes for atoms, data sources and atomic weights.
//!
//! # Invariants
//! - An `Atom` is identified by its atomic number and is never created by
//!   ingestion code.
//! - At most one `AtomicWeight` exists per `(atomic_number, data_source_id)`.
//! - `DataSource::short_name` is unique across the store.

use serde::{Deserialize, Serialize};

/// Atomic number, the natural key of a chemical element.
pub type AtomicNumber = u32;

/// Row id of a stored data source.
pub type DataSourceId = i64;

/// Row id of a stored quantity.
pub type QuantityId = i64;

/// Unit every atomic weight is stored in (unified atomic mass unit).
pub const ATOMIC_WEIGHT_UNIT: &str = "u";

/// Chemical element as pre-seeded in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atom {
    pub atomic_number: AtomicNumber,
    pub symbol: String,
    pub name: Option<String>,
}

impl Atom {
    pub fn new(atomic_number: AtomicNumber, symbol: impl Into<String>) -> Self {
        Self {
            atomic_number,
            symbol: symbol.into(),
            name: None,
        }
    }
}

/// Reference database a quantity came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: DataSourceId,
    /// Short tag such as `nist`.
    pub short_name: String,
    pub name: Option<String>,
}

/// Stored atomic weight of one element from one data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicWeight {
    pub id: QuantityId,
    pub atomic_number: AtomicNumber,
    pub data_source_id: DataSourceId,
    pub value: f64,
    pub std_dev: Option<f64>,
    pub unit: String,
}

/// Insert payload for a new atomic weight.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAtomicWeight {
    pub atomic_number: AtomicNumber,
    pub data_source_id: DataSourceId,
    pub value: f64,
    pub std_dev: Option<f64>,
}
