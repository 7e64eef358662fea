//! YAML configuration loading and validation.
//!
//! # Responsibility
//! - Parse the run configuration file into an immutable [`CleanupConfig`].
//! - Reject absent or blank required keys before any database is touched.
//!
//! # Invariants
//! - Loading performs file-system reads of the config file only.
//! - Required keys are checked in a fixed order; the first gap is reported.

use crate::db::statements::ApplyPolicy;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Required configuration keys, in validation order.
pub const REQUIRED_KEYS: &[&str] = &[
    "blocks_db",
    "tx_db",
    "logs_db",
    "wdls_db",
    "missing_statements",
    "tmp_dir",
];

const DEFAULT_MANIFEST_FILE_NAME: &str = "blaster_cleanup.manifest.json";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_yaml::Error),
    MissingKey(&'static str),
    InvalidPolicy(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config YAML: {err}"),
            Self::MissingKey(key) => write!(f, "config missing required key `{key}`"),
            Self::InvalidPolicy(value) => write!(
                f,
                "unsupported migration_policy `{value}`; expected continue|abort"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::MissingKey(_) | Self::InvalidPolicy(_) => None,
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Parse(value)
    }
}

/// Validated, path-bearing run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupConfig {
    pub blocks_db: PathBuf,
    pub tx_db: PathBuf,
    pub logs_db: PathBuf,
    pub wdls_db: PathBuf,
    /// Directory holding `tx*` and `lo*` statement files.
    pub missing_statements: PathBuf,
    /// Spill directory for SQLite temporaries.
    pub tmp_dir: PathBuf,
    /// Statement policy for schema migrations.
    pub migration_policy: ApplyPolicy,
    /// Resume manifest for `all` runs.
    pub run_manifest: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    blocks_db: Option<String>,
    tx_db: Option<String>,
    logs_db: Option<String>,
    wdls_db: Option<String>,
    missing_statements: Option<String>,
    tmp_dir: Option<String>,
    migration_policy: Option<String>,
    run_manifest: Option<String>,
}

/// Reads and validates a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<CleanupConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

/// Parses and validates configuration YAML text.
pub fn parse_config(text: &str) -> ConfigResult<CleanupConfig> {
    // An empty document deserializes to unit; treat it as a config with no keys.
    let raw: RawConfig = serde_yaml::from_str::<Option<RawConfig>>(text)?.unwrap_or_default();
    raw.validate()
}

impl RawConfig {
    fn validate(self) -> ConfigResult<CleanupConfig> {
        let blocks_db = require(self.blocks_db, REQUIRED_KEYS[0])?;
        let tx_db = require(self.tx_db, REQUIRED_KEYS[1])?;
        let logs_db = require(self.logs_db, REQUIRED_KEYS[2])?;
        let wdls_db = require(self.wdls_db, REQUIRED_KEYS[3])?;
        let missing_statements = require(self.missing_statements, REQUIRED_KEYS[4])?;
        let tmp_dir = require(self.tmp_dir, REQUIRED_KEYS[5])?;

        let migration_policy = match self.migration_policy.as_deref().map(str::trim) {
            None | Some("") => ApplyPolicy::ContinueAndReport,
            Some(value) => parse_policy(value)?,
        };

        let run_manifest = match self.run_manifest.as_deref().map(str::trim) {
            None | Some("") => tmp_dir.join(DEFAULT_MANIFEST_FILE_NAME),
            Some(value) => PathBuf::from(value),
        };

        Ok(CleanupConfig {
            blocks_db,
            tx_db,
            logs_db,
            wdls_db,
            missing_statements,
            tmp_dir,
            migration_policy,
            run_manifest,
        })
    }
}

fn require(value: Option<String>, key: &'static str) -> ConfigResult<PathBuf> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(PathBuf::from(value.trim())),
        _ => Err(ConfigError::MissingKey(key)),
    }
}

fn parse_policy(value: &str) -> ConfigResult<ApplyPolicy> {
    match value.to_ascii_lowercase().as_str() {
        "continue" | "continue-and-report" => Ok(ApplyPolicy::ContinueAndReport),
        "abort" | "abort-on-first-error" => Ok(ApplyPolicy::AbortOnFirstError),
        _ => Err(ConfigError::InvalidPolicy(value.to_string())),
    }
}
