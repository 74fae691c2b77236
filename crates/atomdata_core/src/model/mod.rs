//! Reference-data domain model.
//!
//! # Responsibility
//! - Define measured-quantity types and the uncertainty reconciler.
//! - Define persisted element, data-source and weight records.
//!
//! # Invariants
//! - Elements are keyed by atomic number; quantities by
//!   `(atomic_number, data_source_id)`.

pub mod element;
pub mod quantity;
