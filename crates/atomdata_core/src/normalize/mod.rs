//! Normalization of parsed row tables into store-ready tables.
//!
//! # Invariants
//! - Normalization-level anomalies are propagated; they abort ingestion.

pub mod atomic_weight;
