//! Resume manifest for multi-step `all` runs.
//!
//! # Invariants
//! - Completed steps are appended in execution order and never removed.
//! - Writes go to a sibling temp file first and are renamed into place.
//! - A manifest only resumes a run over the same databases and statements
//!   directory it was written for.

use super::Step;
use crate::config::CleanupConfig;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
pub enum ManifestError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The manifest was written for different databases.
    TargetMismatch { path: PathBuf },
}

impl Display for ManifestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "run manifest `{}` I/O failed: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "run manifest `{}` is malformed: {source}", path.display())
            }
            Self::TargetMismatch { path } => write!(
                f,
                "run manifest `{}` belongs to a run over other databases; remove it to start over",
                path.display()
            ),
        }
    }
}

impl Error for ManifestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::TargetMismatch { .. } => None,
        }
    }
}

/// Paths a run reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTargets {
    pub blocks_db: PathBuf,
    pub tx_db: PathBuf,
    pub logs_db: PathBuf,
    pub wdls_db: PathBuf,
    pub missing_statements: PathBuf,
}

impl RunTargets {
    pub fn from_config(config: &CleanupConfig) -> Self {
        Self {
            blocks_db: config.blocks_db.clone(),
            tx_db: config.tx_db.clone(),
            logs_db: config.logs_db.clone(),
            wdls_db: config.wdls_db.clone(),
            missing_statements: config.missing_statements.clone(),
        }
    }
}

/// Persisted record of the steps an interrupted run already finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub targets: RunTargets,
    pub completed: Vec<Step>,
    #[serde(skip)]
    path: PathBuf,
}

impl RunManifest {
    /// Loads the manifest at `path`, or starts a fresh one for `targets`
    /// when absent.
    ///
    /// # Errors
    /// - [`ManifestError::TargetMismatch`] when the stored targets differ.
    pub fn load_or_new(path: &Path, targets: &RunTargets) -> Result<Self, ManifestError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self {
                    run_id: Uuid::new_v4(),
                    targets: targets.clone(),
                    completed: Vec::new(),
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(ManifestError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut manifest: Self =
            serde_json::from_str(&text).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if manifest.targets != *targets {
            return Err(ManifestError::TargetMismatch {
                path: path.to_path_buf(),
            });
        }
        manifest.path = path.to_path_buf();
        Ok(manifest)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_resumed(&self) -> bool {
        !self.completed.is_empty()
    }

    pub fn is_completed(&self, step: Step) -> bool {
        self.completed.contains(&step)
    }

    /// Records `step` and persists the manifest.
    pub fn mark_completed(&mut self, step: Step) -> Result<(), ManifestError> {
        if !self.is_completed(step) {
            self.completed.push(step);
        }
        self.save()
    }

    fn save(&self) -> Result<(), ManifestError> {
        let io_error = |source| ManifestError::Io {
            path: self.path.clone(),
            source,
        };
        let text = serde_json::to_string_pretty(self).map_err(|source| ManifestError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        std::fs::write(&staging, text).map_err(io_error)?;
        std::fs::rename(&staging, &self.path).map_err(io_error)
    }

    /// Deletes the manifest file once the run finished cleanly.
    pub fn remove(self) -> Result<(), ManifestError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ManifestError::Io {
                path: self.path,
                source,
            }),
        }
    }
}
