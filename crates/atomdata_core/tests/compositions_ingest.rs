use atomdata_core::db::open_db_in_memory;
use atomdata_core::ingest::FetchResult;
use atomdata_core::model::element::NewAtomicWeight;
use atomdata_core::{
    upsert_atomic_weights, Atom, AtomicWeightRecord, AtomicWeightTable, CompositionsConfig,
    CompositionsIngester, ConfigError, FetchError, IngestError, Ingester, IngesterState,
    LoggingConfig, NormalizeError, PageFetcher, ReferenceRepository, SqliteReferenceRepository,
};
use std::path::PathBuf;
use rusqlite::Connection;
use std::cell::{Cell, RefCell};

const SAMPLE: &str = include_str!("data/compositions_sample.txt");

struct StubFetcher {
    text: String,
    calls: Cell<usize>,
    last_request: RefCell<Option<(String, Vec<(String, String)>)>>,
}

impl StubFetcher {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: Cell::new(0),
            last_request: RefCell::new(None),
        }
    }
}

impl PageFetcher for StubFetcher {
    fn fetch(&self, url: &str, params: &[(String, String)]) -> FetchResult<String> {
        self.calls.set(self.calls.get() + 1);
        *self.last_request.borrow_mut() = Some((url.to_string(), params.to_vec()));
        Ok(self.text.clone())
    }
}

struct FailingFetcher;

impl PageFetcher for FailingFetcher {
    fn fetch(&self, url: &str, _params: &[(String, String)]) -> FetchResult<String> {
        Err(FetchError::MissingPreformatted {
            url: url.to_string(),
        })
    }
}

fn seeded_db(atoms: &[(u32, &str)]) -> Connection {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteReferenceRepository::new(&conn);
    for (atomic_number, symbol) in atoms {
        repo.create_atom(&Atom::new(*atomic_number, *symbol)).unwrap();
    }
    conn
}

fn downloaded_ingester(text: &str) -> CompositionsIngester<StubFetcher> {
    let mut ingester =
        CompositionsIngester::try_new(CompositionsConfig::default(), StubFetcher::new(text))
            .unwrap();
    ingester.download().unwrap();
    ingester
}

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn download_fetches_configured_page_once_and_parses() {
    let mut ingester =
        CompositionsIngester::try_new(CompositionsConfig::default(), StubFetcher::new(SAMPLE))
            .unwrap();
    assert_eq!(ingester.state(), IngesterState::Unfetched);
    assert_eq!(ingester.data_source(), "nist");

    ingester.download().unwrap();

    assert_eq!(ingester.state(), IngesterState::Parsed);
    assert_eq!(ingester.row_table().unwrap().len(), 12);
}

#[test]
fn stub_fetcher_receives_url_and_params_from_config() {
    let fetcher = StubFetcher::new(SAMPLE);
    let config = CompositionsConfig::default();
    fetcher.fetch(&config.url, &config.params).unwrap();

    let (url, params) = fetcher.last_request.borrow().clone().unwrap();
    assert_eq!(url, config.url);
    assert!(params.contains(&("isotype".to_string(), "some".to_string())));
    assert_eq!(fetcher.calls.get(), 1);
}

#[test]
fn ingest_before_download_fails() {
    let mut conn = seeded_db(&[(1, "H")]);
    let mut ingester =
        CompositionsIngester::try_new(CompositionsConfig::default(), StubFetcher::new(SAMPLE))
            .unwrap();

    let err = ingester.ingest(&mut conn).unwrap_err();
    assert!(matches!(err, IngestError::NotDownloaded));
    assert_eq!(ingester.state(), IngesterState::Unfetched);
}

#[test]
fn download_failure_keeps_ingester_unfetched() {
    let mut ingester =
        CompositionsIngester::try_new(CompositionsConfig::default(), FailingFetcher).unwrap();

    let err = ingester.download().unwrap_err();
    assert!(matches!(err, IngestError::Fetch(_)));
    assert_eq!(ingester.state(), IngesterState::Unfetched);
}

#[test]
fn invalid_config_is_rejected_on_construction() {
    let config = CompositionsConfig {
        data_source_short_name: String::new(),
        ..CompositionsConfig::default()
    };
    let result = CompositionsIngester::try_new(config, StubFetcher::new(SAMPLE));
    assert!(matches!(result, Err(IngestError::Config(_))));
}

#[test]
fn construction_starts_file_logging_from_config() {
    let root = tempfile::tempdir().unwrap();
    let log_dir = root.path().join("logs");
    let config = CompositionsConfig {
        logging: LoggingConfig {
            level: "info".to_string(),
            dir: Some(log_dir.clone()),
        },
        ..CompositionsConfig::default()
    };

    CompositionsIngester::try_new(config, StubFetcher::new(SAMPLE)).unwrap();
    assert!(log_dir.is_dir());

    let relative = CompositionsConfig {
        logging: LoggingConfig {
            dir: Some(PathBuf::from("logs")),
            ..LoggingConfig::default()
        },
        ..CompositionsConfig::default()
    };
    let result = CompositionsIngester::try_new(relative, StubFetcher::new(SAMPLE));
    assert!(matches!(
        result,
        Err(IngestError::Config(ConfigError::RelativeLogDir(_)))
    ));
}

#[test]
fn first_ingest_creates_weights_for_resolved_elements() {
    let mut conn = seeded_db(&[(1, "H"), (2, "He"), (8, "O"), (43, "Tc")]);
    let mut ingester = downloaded_ingester(SAMPLE);

    let report = ingester.ingest(&mut conn).unwrap();

    assert_eq!(ingester.state(), IngesterState::Ingested);
    assert_eq!(report.created, 4);
    assert_eq!(report.updated, 0);
    assert_eq!(report.skipped, 1);
    assert!(!report.run_id.is_nil());

    let repo = SqliteReferenceRepository::new(&conn);
    let source = repo.get_data_source("nist").unwrap().unwrap();
    assert_eq!(source.id, report.data_source_id);
    let weights = repo.list_atomic_weights(source.id).unwrap();
    let numbers: Vec<u32> = weights.iter().map(|w| w.atomic_number).collect();
    assert_eq!(numbers, vec![1, 2, 8, 43]);

    let technetium = weights.iter().find(|w| w.atomic_number == 43).unwrap();
    assert!((technetium.value - 97.9072124).abs() < 1e-9);
}

#[test]
fn reingesting_same_data_creates_nothing_and_keeps_values() {
    let mut conn = seeded_db(&[(1, "H"), (2, "He"), (8, "O"), (43, "Tc")]);
    let mut ingester = downloaded_ingester(SAMPLE);

    ingester.ingest(&mut conn).unwrap();
    let before = {
        let repo = SqliteReferenceRepository::new(&conn);
        let source = repo.get_data_source("nist").unwrap().unwrap();
        repo.list_atomic_weights(source.id).unwrap()
    };

    let second = ingester.ingest(&mut conn).unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 4);
    assert_eq!(count_rows(&conn, "atomic_weights"), 4);
    assert_eq!(count_rows(&conn, "data_sources"), 1);

    let repo = SqliteReferenceRepository::new(&conn);
    let after = repo.list_atomic_weights(second.data_source_id).unwrap();
    assert_eq!(before, after);
}

#[test]
fn update_changes_only_matching_source_row() {
    let mut conn = seeded_db(&[(1, "H"), (8, "O")]);
    let (nist_id, nist_weight_id, ku_id, ku_weight_id) = {
        let repo = SqliteReferenceRepository::new(&conn);
        let nist = repo.upsert_data_source("nist", None).unwrap();
        let ku = repo.upsert_data_source("ku", None).unwrap();
        let nist_weight_id = repo
            .create_atomic_weight(&NewAtomicWeight {
                atomic_number: 1,
                data_source_id: nist.id,
                value: 1.00784,
                std_dev: Some(4e-3),
            })
            .unwrap();
        let ku_weight_id = repo
            .create_atomic_weight(&NewAtomicWeight {
                atomic_number: 1,
                data_source_id: ku.id,
                value: 1.00811,
                std_dev: Some(4e-3),
            })
            .unwrap();
        assert_ne!(nist_weight_id, ku_weight_id);
        (nist.id, nist_weight_id, ku.id, ku_weight_id)
    };

    let table: AtomicWeightTable = [AtomicWeightRecord {
        atomic_number: 1,
        value: Some(1.008),
        std_dev: Some(0.0002),
    }]
    .into_iter()
    .collect();
    let report = upsert_atomic_weights(&mut conn, &table, "nist", None).unwrap();
    assert_eq!(report.data_source_id, nist_id);
    assert_eq!((report.created, report.updated), (0, 1));

    let repo = SqliteReferenceRepository::new(&conn);
    let nist_weights = repo.list_atomic_weights(nist_id).unwrap();
    assert_eq!(nist_weights.len(), 1);
    assert_eq!(nist_weights[0].id, nist_weight_id);
    assert_eq!(nist_weights[0].value, 1.008);
    assert_eq!(nist_weights[0].std_dev, Some(0.0002));

    let ku_weights = repo.list_atomic_weights(ku_id).unwrap();
    assert_eq!(ku_weights.len(), 1);
    assert_eq!(ku_weights[0].id, ku_weight_id);
    assert_eq!(ku_weights[0].value, 1.00811);
}

#[test]
fn null_value_never_creates_a_quantity() {
    let mut conn = seeded_db(&[(118, "Og"), (1, "H")]);
    let table: AtomicWeightTable = [
        AtomicWeightRecord {
            atomic_number: 118,
            value: None,
            std_dev: None,
        },
        AtomicWeightRecord {
            atomic_number: 1,
            value: Some(1.008),
            std_dev: None,
        },
    ]
    .into_iter()
    .collect();

    let report = upsert_atomic_weights(&mut conn, &table, "nist", None).unwrap();
    assert_eq!((report.created, report.skipped), (1, 1));

    let repo = SqliteReferenceRepository::new(&conn);
    assert!(repo.list_atom_weights(118).unwrap().is_empty());
    assert_eq!(repo.list_atom_weights(1).unwrap().len(), 1);
}

#[test]
fn unknown_element_aborts_without_partial_commit() {
    let mut conn = seeded_db(&[(1, "H"), (2, "He"), (8, "O")]);
    let mut ingester = downloaded_ingester(SAMPLE);

    let err = ingester.ingest(&mut conn).unwrap_err();

    assert!(matches!(err, IngestError::UnknownElement(43)));
    assert_eq!(ingester.state(), IngesterState::Parsed);
    assert_eq!(count_rows(&conn, "atomic_weights"), 0);
    assert_eq!(count_rows(&conn, "data_sources"), 0);
}

#[test]
fn unresolved_reference_leaves_store_untouched() {
    let mut conn = seeded_db(&[(1, "H"), (43, "Tc")]);
    {
        let repo = SqliteReferenceRepository::new(&conn);
        let nist = repo.upsert_data_source("nist", None).unwrap();
        repo.create_atomic_weight(&NewAtomicWeight {
            atomic_number: 1,
            data_source_id: nist.id,
            value: 1.0,
            std_dev: None,
        })
        .unwrap();
    }
    let text = "\
Atomic Number = 1
Atomic Symbol = H
Mass Number = 1
Relative Atomic Mass = 1.00782503223(9)
Standard Atomic Weight = [1.00784,1.00811]

Atomic Number = 43
Atomic Symbol = Tc
Mass Number = 97
Relative Atomic Mass = 96.9063667(40)
Standard Atomic Weight = [98]
";
    let mut ingester = downloaded_ingester(text);

    let err = ingester.ingest(&mut conn).unwrap_err();

    assert!(matches!(
        err,
        IngestError::Normalize(NormalizeError::UnresolvedReference {
            atomic_number: 43,
            mass_number: 98
        })
    ));
    let repo = SqliteReferenceRepository::new(&conn);
    let weights = repo.list_atom_weights(1).unwrap();
    assert_eq!(weights.len(), 1);
    assert_eq!(weights[0].value, 1.0);
    assert_eq!(count_rows(&conn, "atomic_weights"), 1);
}
