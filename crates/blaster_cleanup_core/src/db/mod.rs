//! SQLite access layer shared by every run step.
//!
//! # Responsibility
//! - Open target databases with the temp-directory pragma applied.
//! - Apply statement lists under an explicit error policy.
//! - Apply versioned schema sets per database kind.
//!
//! # Invariants
//! - Connections are opened per operation and dropped when it ends.
//! - No data-mutating statement runs before the pragma succeeded.

use crate::model::DatabaseKind;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;
mod pragma;
pub mod statements;

pub use open::{open_source_read_only, open_target};
pub use pragma::set_temp_dir;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    MissingDatabase(PathBuf),
    NoMigrationSet(DatabaseKind),
    /// The temp-directory pragma could not be applied.
    TempDir {
        dir: PathBuf,
        reason: String,
    },
    /// A statement failed under the abort-on-first-error policy.
    Statement {
        index: usize,
        statement: String,
        source: rusqlite::Error,
    },
    StatementFile {
        path: PathBuf,
        source: std::io::Error,
    },
    TableExists {
        table: &'static str,
        path: PathBuf,
    },
    RowCountMismatch {
        expected: u64,
        copied: u64,
    },
    /// A path that has to be passed to SQLite as text is not valid UTF-8.
    NonUtf8Path(PathBuf),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::MissingDatabase(path) => {
                write!(f, "database file `{}` does not exist", path.display())
            }
            Self::NoMigrationSet(kind) => write!(f, "no migration set for `{kind}` database"),
            Self::TempDir { dir, reason } => write!(
                f,
                "failed to set temp directory `{}`: {reason}",
                dir.display()
            ),
            Self::Statement {
                index,
                statement,
                source,
            } => write!(f, "statement #{index} failed: {source}; statement: {statement}"),
            Self::StatementFile { path, source } => write!(
                f,
                "failed to read statement file `{}`: {source}",
                path.display()
            ),
            Self::TableExists { table, path } => write!(
                f,
                "table `{table}` already exists in `{}`",
                path.display()
            ),
            Self::RowCountMismatch { expected, copied } => write!(
                f,
                "copied {copied} rows but source holds {expected}"
            ),
            Self::NonUtf8Path(path) => {
                write!(f, "path `{}` is not valid UTF-8", path.display())
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Statement { source, .. } => Some(source),
            Self::StatementFile { source, .. } => Some(source),
            Self::MissingDatabase(_)
            | Self::NoMigrationSet(_)
            | Self::TempDir { .. }
            | Self::TableExists { .. }
            | Self::RowCountMismatch { .. }
            | Self::NonUtf8Path(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
