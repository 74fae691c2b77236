//! Reference-data repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the store operations the ingesters depend on: query weights by
//!   data source, get an atom, append a weight, update a weight in place.
//! - Own data-source identity through an explicit upsert.
//!
//! # Invariants
//! - Repository methods never commit; the caller owns the transaction.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::element::{
    Atom, AtomicNumber, AtomicWeight, DataSource, DataSourceId, NewAtomicWeight, QuantityId,
    ATOMIC_WEIGHT_UNIT,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ATOMIC_WEIGHT_SELECT_SQL: &str = "SELECT
    id,
    atomic_number,
    data_source_id,
    value,
    std_dev,
    unit
FROM atomic_weights";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for reference-data persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::InvalidData(message) => write!(f, "invalid data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Store operations shared by all ingesters.
pub trait ReferenceRepository {
    /// Creates the data source if absent, refreshes its name otherwise.
    fn upsert_data_source(&self, short_name: &str, name: Option<&str>) -> RepoResult<DataSource>;
    fn get_data_source(&self, short_name: &str) -> RepoResult<Option<DataSource>>;
    fn create_atom(&self, atom: &Atom) -> RepoResult<()>;
    fn get_atom(&self, atomic_number: AtomicNumber) -> RepoResult<Option<Atom>>;
    fn list_atoms(&self) -> RepoResult<Vec<Atom>>;
    /// All weights tagged with `data_source_id`, ordered by atomic number.
    fn list_atomic_weights(&self, data_source_id: DataSourceId) -> RepoResult<Vec<AtomicWeight>>;
    /// All weights of one element across data sources.
    fn list_atom_weights(&self, atomic_number: AtomicNumber) -> RepoResult<Vec<AtomicWeight>>;
    fn create_atomic_weight(&self, weight: &NewAtomicWeight) -> RepoResult<QuantityId>;
    fn update_atomic_weight(
        &self,
        id: QuantityId,
        value: f64,
        std_dev: Option<f64>,
    ) -> RepoResult<()>;
}

/// SQLite-backed reference repository.
///
/// Accepts a plain connection or a `rusqlite::Transaction` (via deref), so an
/// ingester can run every call inside one transaction.
pub struct SqliteReferenceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReferenceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ReferenceRepository for SqliteReferenceRepository<'_> {
    fn upsert_data_source(&self, short_name: &str, name: Option<&str>) -> RepoResult<DataSource> {
        self.conn.execute(
            "INSERT INTO data_sources (short_name, name)
             VALUES (?1, ?2)
             ON CONFLICT (short_name) DO UPDATE
             SET name = COALESCE(excluded.name, data_sources.name);",
            params![short_name, name],
        )?;

        self.get_data_source(short_name)?
            .ok_or_else(|| RepoError::NotFound(format!("data source `{short_name}`")))
    }

    fn get_data_source(&self, short_name: &str) -> RepoResult<Option<DataSource>> {
        let source = self
            .conn
            .query_row(
                "SELECT id, short_name, name FROM data_sources WHERE short_name = ?1;",
                [short_name],
                |row| {
                    Ok(DataSource {
                        id: row.get("id")?,
                        short_name: row.get("short_name")?,
                        name: row.get("name")?,
                    })
                },
            )
            .optional()?;
        Ok(source)
    }

    fn create_atom(&self, atom: &Atom) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO atoms (atomic_number, symbol, name) VALUES (?1, ?2, ?3);",
            params![atom.atomic_number, atom.symbol.as_str(), atom.name.as_deref()],
        )?;
        Ok(())
    }

    fn get_atom(&self, atomic_number: AtomicNumber) -> RepoResult<Option<Atom>> {
        let atom = self
            .conn
            .query_row(
                "SELECT atomic_number, symbol, name FROM atoms WHERE atomic_number = ?1;",
                [atomic_number],
                parse_atom_row,
            )
            .optional()?;
        Ok(atom)
    }

    fn list_atoms(&self) -> RepoResult<Vec<Atom>> {
        let mut stmt = self
            .conn
            .prepare("SELECT atomic_number, symbol, name FROM atoms ORDER BY atomic_number ASC;")?;
        let atoms = stmt
            .query_map([], parse_atom_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(atoms)
    }

    fn list_atomic_weights(&self, data_source_id: DataSourceId) -> RepoResult<Vec<AtomicWeight>> {
        self.query_weights(
            &format!(
                "{ATOMIC_WEIGHT_SELECT_SQL}
                 WHERE data_source_id = ?1
                 ORDER BY atomic_number ASC, id ASC;"
            ),
            data_source_id,
        )
    }

    fn list_atom_weights(&self, atomic_number: AtomicNumber) -> RepoResult<Vec<AtomicWeight>> {
        self.query_weights(
            &format!(
                "{ATOMIC_WEIGHT_SELECT_SQL}
                 WHERE atomic_number = ?1
                 ORDER BY data_source_id ASC, id ASC;"
            ),
            i64::from(atomic_number),
        )
    }

    fn create_atomic_weight(&self, weight: &NewAtomicWeight) -> RepoResult<QuantityId> {
        validate_weight(weight.value, weight.std_dev)?;

        self.conn.execute(
            "INSERT INTO atomic_weights (
                atomic_number,
                data_source_id,
                value,
                std_dev,
                unit
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                weight.atomic_number,
                weight.data_source_id,
                weight.value,
                weight.std_dev,
                ATOMIC_WEIGHT_UNIT,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_atomic_weight(
        &self,
        id: QuantityId,
        value: f64,
        std_dev: Option<f64>,
    ) -> RepoResult<()> {
        validate_weight(value, std_dev)?;

        let changed = self.conn.execute(
            "UPDATE atomic_weights
             SET
                value = ?1,
                std_dev = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?3;",
            params![value, std_dev, id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(format!("atomic weight {id}")));
        }

        Ok(())
    }
}

impl SqliteReferenceRepository<'_> {
    fn query_weights(&self, sql: &str, key: i64) -> RepoResult<Vec<AtomicWeight>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([key])?;
        let mut weights = Vec::new();

        while let Some(row) = rows.next()? {
            weights.push(parse_atomic_weight_row(row)?);
        }

        Ok(weights)
    }
}

fn parse_atom_row(row: &Row<'_>) -> rusqlite::Result<Atom> {
    Ok(Atom {
        atomic_number: row.get("atomic_number")?,
        symbol: row.get("symbol")?,
        name: row.get("name")?,
    })
}

fn parse_atomic_weight_row(row: &Row<'_>) -> RepoResult<AtomicWeight> {
    let id: QuantityId = row.get("id")?;
    let value: f64 = row.get("value")?;
    let std_dev: Option<f64> = row.get("std_dev")?;
    if !value.is_finite() {
        return Err(RepoError::InvalidData(format!(
            "non-finite value `{value}` in atomic_weights.value for id {id}"
        )));
    }

    Ok(AtomicWeight {
        id,
        atomic_number: row.get("atomic_number")?,
        data_source_id: row.get("data_source_id")?,
        value,
        std_dev,
        unit: row.get("unit")?,
    })
}

fn validate_weight(value: f64, std_dev: Option<f64>) -> RepoResult<()> {
    if !value.is_finite() {
        return Err(RepoError::InvalidData(format!(
            "atomic weight value must be finite, got `{value}`"
        )));
    }
    if let Some(std_dev) = std_dev {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(RepoError::InvalidData(format!(
                "atomic weight std_dev must be finite and non-negative, got `{std_dev}`"
            )));
        }
    }
    Ok(())
}
