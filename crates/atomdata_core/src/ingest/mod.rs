//! Ingestion contract shared by all reference-data sources.
//!
//! # Responsibility
//! - Define the `download` → `ingest` lifecycle every source follows.
//! - Define ingestion errors and the per-run report.
//!
//! # Invariants
//! - `ingest` requires a prior successful `download`.
//! - One `ingest` call is one all-or-nothing store transaction.
//! - Callers serialize runs per data source; there is no internal locking.

use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::model::element::{AtomicNumber, DataSourceId};
use crate::normalize::atomic_weight::NormalizeError;
use crate::repo::reference_repo::RepoError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod compositions;
pub mod fetch;

pub use fetch::{FetchError, FetchResult, HttpPageFetcher, PageFetcher};

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Debug)]
pub enum IngestError {
    Config(ConfigError),
    Logging(LoggingError),
    /// `ingest` was called before `download`.
    NotDownloaded,
    Fetch(FetchError),
    Normalize(NormalizeError),
    /// A new weight targets an element that was never seeded in the store.
    UnknownElement(AtomicNumber),
    Repo(RepoError),
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid ingester config: {err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::NotDownloaded => write!(f, "source data has not been downloaded"),
            Self::Fetch(err) => write!(f, "{err}"),
            Self::Normalize(err) => write!(f, "{err}"),
            Self::UnknownElement(atomic_number) => {
                write!(f, "element {atomic_number} does not exist in the store")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotDownloaded | Self::UnknownElement(_) => None,
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Fetch(err) => Some(err),
            Self::Normalize(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<ConfigError> for IngestError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for IngestError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<FetchError> for IngestError {
    fn from(value: FetchError) -> Self {
        Self::Fetch(value)
    }
}

impl From<NormalizeError> for IngestError {
    fn from(value: NormalizeError) -> Self {
        Self::Normalize(value)
    }
}

impl From<RepoError> for IngestError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Lifecycle position of an ingester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngesterState {
    Unfetched,
    /// Source text fetched and parsed; ready to ingest.
    Parsed,
    Ingested,
}

/// Outcome of one committed ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Correlates the run's log events.
    pub run_id: Uuid,
    pub data_source_id: DataSourceId,
    pub created: usize,
    pub updated: usize,
    /// Elements without a resolved value; nothing was written for them.
    pub skipped: usize,
}

/// Generic ingestion contract.
pub trait Ingester {
    /// Short tag of the data source this ingester writes.
    fn data_source(&self) -> &str;

    fn state(&self) -> IngesterState;

    /// Fetches and parses the source. Moves `Unfetched` to `Parsed`.
    fn download(&mut self) -> IngestResult<()>;

    /// Merges parsed data into the store and commits.
    ///
    /// On any error the transaction is rolled back and the store is unchanged.
    fn ingest(&mut self, conn: &mut Connection) -> IngestResult<IngestReport>;
}
