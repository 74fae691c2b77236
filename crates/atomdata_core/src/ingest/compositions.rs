//! Ingester for the NIST Atomic Weights and Isotopic Compositions database.
//!
//! # Responsibility
//! - Fetch and parse the compositions table.
//! - Upsert per-element atomic weights under one data-source tag.
//!
//! # Invariants
//! - Existing weights are matched to input records by atomic number, never by
//!   position.
//! - Existing rows are updated in place (identity preserved); other data
//!   sources' rows are never touched.
//! - Elements without a resolved value never create a weight.
//! - Normalization runs before the transaction opens, so a normalization error
//!   leaves the store untouched.
//!
//! Only atomic weights are ingested; isotope-level quantities are not.

use crate::config::CompositionsConfig;
use crate::ingest::fetch::{HttpPageFetcher, PageFetcher};
use crate::ingest::{IngestError, IngestReport, IngestResult, Ingester, IngesterState};
use crate::logging::init_logging;
use crate::model::element::{AtomicNumber, AtomicWeight, NewAtomicWeight};
use crate::normalize::atomic_weight::{prepare_atomic_weights, AtomicWeightTable};
use crate::parse::compositions::{parse_compositions, RowTable};
use crate::repo::reference_repo::{ReferenceRepository, SqliteReferenceRepository};
use log::{error, info};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Compositions ingester over any page fetcher.
pub struct CompositionsIngester<F: PageFetcher> {
    config: CompositionsConfig,
    fetcher: F,
    rows: Option<RowTable>,
    state: IngesterState,
}

impl CompositionsIngester<HttpPageFetcher> {
    /// Builds an ingester that downloads over HTTP.
    pub fn with_http(config: CompositionsConfig) -> IngestResult<Self> {
        let fetcher = HttpPageFetcher::new(Duration::from_secs(config.timeout_secs))?;
        Self::try_new(config, fetcher)
    }
}

impl<F: PageFetcher> CompositionsIngester<F> {
    /// Validates `config` and starts file logging when it names a log dir.
    pub fn try_new(config: CompositionsConfig, fetcher: F) -> IngestResult<Self> {
        config.validate()?;
        init_logging(&config.logging)?;
        Ok(Self {
            config,
            fetcher,
            rows: None,
            state: IngesterState::Unfetched,
        })
    }

    pub fn config(&self) -> &CompositionsConfig {
        &self.config
    }

    /// Parses already-retrieved text, bypassing the fetcher.
    pub fn load(&mut self, text: &str) {
        self.rows = Some(parse_compositions(text));
        self.state = IngesterState::Parsed;
    }

    /// Parsed isotope table, once downloaded.
    pub fn row_table(&self) -> Option<&RowTable> {
        self.rows.as_ref()
    }

    /// Derives the per-element weight table from the parsed rows.
    pub fn prepare_atomic_weights(&self) -> IngestResult<AtomicWeightTable> {
        let rows = self.rows.as_ref().ok_or(IngestError::NotDownloaded)?;
        Ok(prepare_atomic_weights(rows)?)
    }
}

impl<F: PageFetcher> Ingester for CompositionsIngester<F> {
    fn data_source(&self) -> &str {
        &self.config.data_source_short_name
    }

    fn state(&self) -> IngesterState {
        self.state
    }

    fn download(&mut self) -> IngestResult<()> {
        let text = self.fetcher.fetch(&self.config.url, &self.config.params)?;
        self.load(&text);
        Ok(())
    }

    fn ingest(&mut self, conn: &mut Connection) -> IngestResult<IngestReport> {
        let weights = self.prepare_atomic_weights()?;
        let report = upsert_atomic_weights(
            conn,
            &weights,
            &self.config.data_source_short_name,
            self.config.data_source_name.as_deref(),
        )?;
        self.state = IngesterState::Ingested;
        Ok(report)
    }
}

/// Merges a per-element weight table into the store in one transaction.
///
/// # Contract
/// - The data source is upserted by `short_name` first.
/// - Elements with a stored weight for this source are updated in place.
/// - New elements with a value get a new weight; the atom must exist.
/// - Elements without a value are skipped.
///
/// # Errors
/// - `UnknownElement` when a new weight targets an atom missing from the store.
/// - Any error rolls the whole transaction back.
pub fn upsert_atomic_weights(
    conn: &mut Connection,
    weights: &AtomicWeightTable,
    short_name: &str,
    name: Option<&str>,
) -> IngestResult<IngestReport> {
    let run_id = Uuid::new_v4();
    let started_at = Instant::now();
    info!(
        "event=ingest module=ingest status=start run_id={run_id} data_source={short_name} elements={}",
        weights.len()
    );

    let result = merge_in_transaction(conn, weights, short_name, name, run_id);
    match &result {
        Ok(report) => info!(
            "event=ingest module=ingest status=ok run_id={run_id} data_source={short_name} created={} updated={} skipped={} duration_ms={}",
            report.created,
            report.updated,
            report.skipped,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=ingest module=ingest status=error run_id={run_id} data_source={short_name} duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn merge_in_transaction(
    conn: &mut Connection,
    weights: &AtomicWeightTable,
    short_name: &str,
    name: Option<&str>,
    run_id: Uuid,
) -> IngestResult<IngestReport> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let repo = SqliteReferenceRepository::new(&tx);

    let source = repo.upsert_data_source(short_name, name)?;
    let existing: BTreeMap<AtomicNumber, AtomicWeight> = repo
        .list_atomic_weights(source.id)?
        .into_iter()
        .map(|weight| (weight.atomic_number, weight))
        .collect();

    let mut report = IngestReport {
        run_id,
        data_source_id: source.id,
        created: 0,
        updated: 0,
        skipped: 0,
    };

    for record in weights.records() {
        let Some(value) = record.value else {
            report.skipped += 1;
            continue;
        };

        match existing.get(&record.atomic_number) {
            Some(stored) => {
                repo.update_atomic_weight(stored.id, value, record.std_dev)?;
                report.updated += 1;
            }
            None => {
                if repo.get_atom(record.atomic_number)?.is_none() {
                    return Err(IngestError::UnknownElement(record.atomic_number));
                }
                repo.create_atomic_weight(&NewAtomicWeight {
                    atomic_number: record.atomic_number,
                    data_source_id: source.id,
                    value,
                    std_dev: record.std_dev,
                })?;
                report.created += 1;
            }
        }
    }

    tx.commit()?;
    Ok(report)
}
