//! Statement file discovery and prefix classification.

use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const TRANSACTIONS_PREFIX: &str = "tx";
pub const LOGS_PREFIX: &str = "lo";

#[derive(Debug)]
pub enum ClassificationError {
    ReadDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    NoMatch {
        prefix: &'static str,
        dir: PathBuf,
    },
    MultipleMatches {
        prefix: &'static str,
        matches: Vec<PathBuf>,
    },
}

impl Display for ClassificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadDir { dir, source } => write!(
                f,
                "failed to read statements directory `{}`: {source}",
                dir.display()
            ),
            Self::NoMatch { prefix, dir } => write!(
                f,
                "no statement file with prefix `{prefix}` in `{}`",
                dir.display()
            ),
            Self::MultipleMatches { prefix, matches } => {
                let names = matches
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "expected one statement file with prefix `{prefix}`, found {}: {names}",
                    matches.len()
                )
            }
        }
    }
}

impl Error for ClassificationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReadDir { source, .. } => Some(source),
            Self::NoMatch { .. } | Self::MultipleMatches { .. } => None,
        }
    }
}

/// The one statement file found for each target database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFiles {
    pub transactions: PathBuf,
    pub logs: PathBuf,
}

/// Scans `dir` for regular files named `tx*` and `lo*`.
///
/// Exactly one file per prefix is required. Other files are ignored.
pub fn classify_statement_files(dir: &Path) -> Result<StatementFiles, ClassificationError> {
    let read_dir_error = |source| ClassificationError::ReadDir {
        dir: dir.to_path_buf(),
        source,
    };

    let mut transactions = Vec::new();
    let mut logs = Vec::new();

    for entry in std::fs::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        if !entry.path().is_file() {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(TRANSACTIONS_PREFIX) {
            transactions.push(entry.path());
        } else if name.starts_with(LOGS_PREFIX) {
            logs.push(entry.path());
        } else {
            debug!("event=classify module=run status=skip file={}", name);
        }
    }

    Ok(StatementFiles {
        transactions: exactly_one(transactions, TRANSACTIONS_PREFIX, dir)?,
        logs: exactly_one(logs, LOGS_PREFIX, dir)?,
    })
}

fn exactly_one(
    mut matches: Vec<PathBuf>,
    prefix: &'static str,
    dir: &Path,
) -> Result<PathBuf, ClassificationError> {
    match matches.len() {
        0 => Err(ClassificationError::NoMatch {
            prefix,
            dir: dir.to_path_buf(),
        }),
        1 => Ok(matches.remove(0)),
        _ => {
            matches.sort();
            Err(ClassificationError::MultipleMatches { prefix, matches })
        }
    }
}
