//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the store contract consumed by ingesters.
//! - Isolate SQLite query details from ingestion orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `InvalidData`) in
//!   addition to DB transport errors.

pub mod reference_repo;
