//! Ingestion configuration.
//!
//! # Responsibility
//! - Describe where a source is fetched from and which data-source tag its
//!   quantities are stored under.
//!
//! # Invariants
//! - A validated config has a non-empty url and a short name matching
//!   `[a-z0-9_-]+`.
//! - A validated logging section has a known level and, when set, an absolute
//!   directory.

use crate::logging::{canonical_level, default_log_level};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const COMPOSITIONS_URL: &str = "https://physics.nist.gov/cgi-bin/Compositions/stand_alone.pl";
pub const NIST_SHORT_NAME: &str = "nist";
const NIST_NAME: &str = "NIST Atomic Weights and Isotopic Compositions";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyUrl,
    InvalidShortName(String),
    ZeroTimeout,
    InvalidLogLevel(String),
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "source url cannot be empty"),
            Self::InvalidShortName(value) => write!(
                f,
                "data source short name `{value}` is invalid; expected [a-z0-9_-]+"
            ),
            Self::ZeroTimeout => write!(f, "timeout_secs must be greater than zero"),
            Self::InvalidLogLevel(level) => write!(
                f,
                "log level `{level}` is invalid; expected trace|debug|info|warn|error"
            ),
            Self::RelativeLogDir(dir) => {
                write!(f, "log dir `{}` must be an absolute path", dir.display())
            }
        }
    }
}

impl Error for ConfigError {}

/// File logging settings; logging stays off while `dir` is unset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if canonical_level(&self.level).is_none() {
            return Err(ConfigError::InvalidLogLevel(self.level.clone()));
        }
        match &self.dir {
            Some(dir) if !dir.is_absolute() => Err(ConfigError::RelativeLogDir(dir.clone())),
            _ => Ok(()),
        }
    }
}

/// Settings for the compositions ingester.
///
/// Every field has a default, so a partial JSON/TOML document only needs to
/// name what it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompositionsConfig {
    pub url: String,
    /// Query parameters sent with the page request.
    pub params: Vec<(String, String)>,
    pub data_source_short_name: String,
    pub data_source_name: Option<String>,
    pub timeout_secs: u64,
    pub logging: LoggingConfig,
}

impl Default for CompositionsConfig {
    fn default() -> Self {
        Self {
            url: COMPOSITIONS_URL.to_string(),
            params: vec![
                ("ascii".to_string(), "ascii2".to_string()),
                ("isotype".to_string(), "some".to_string()),
            ],
            data_source_short_name: NIST_SHORT_NAME.to_string(),
            data_source_name: Some(NIST_NAME.to_string()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            logging: LoggingConfig::default(),
        }
    }
}

impl CompositionsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if !is_valid_short_name(&self.data_source_short_name) {
            return Err(ConfigError::InvalidShortName(
                self.data_source_short_name.clone(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        self.logging.validate()
    }
}

pub(crate) fn is_valid_short_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
