//! Text-table parsing for reference-data sources.
//!
//! # Responsibility
//! - Provide the declarative field grammar shared by text sources.
//! - Turn source text into typed row tables.
//!
//! # Invariants
//! - Parse-level anomalies are recovered per entry (skip and continue).

pub mod compositions;
pub mod grammar;
