//! Atomic reference-data ingestion core.
//! Parses standards-body atomic weight tables and upserts them into the
//! reference store.

pub mod config;
pub mod db;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod parse;
pub mod repo;

pub use config::{CompositionsConfig, ConfigError, LoggingConfig};
pub use ingest::compositions::{upsert_atomic_weights, CompositionsIngester};
pub use ingest::{
    FetchError, HttpPageFetcher, IngestError, IngestReport, IngestResult, Ingester,
    IngesterState, PageFetcher,
};
pub use logging::{default_log_level, init_logging, LoggingError};
pub use model::element::{Atom, AtomicNumber, AtomicWeight, DataSource};
pub use model::quantity::{
    parse_uncertain, reconcile, Interval, InvalidIntervalError, RawQuantity, UncertainValue,
};
pub use normalize::atomic_weight::{
    prepare_atomic_weights, AtomicWeightRecord, AtomicWeightTable, NormalizeError,
};
pub use parse::compositions::{parse_compositions, AtomicWeightKind, IsotopeRow, RowTable};
pub use parse::grammar::{ParseSkip, SkipReason};
pub use repo::reference_repo::{
    ReferenceRepository, RepoError, RepoResult, SqliteReferenceRepository,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
