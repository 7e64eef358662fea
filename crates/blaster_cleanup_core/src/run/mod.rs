//! Mode dispatch and step sequencing.
//!
//! # Responsibility
//! - Map a [`Mode`] to its fixed step sequence and execute it in order.
//! - Classify statement files before any injection touches a database.
//! - Track `all` runs in a resume manifest.
//!
//! # Invariants
//! - Steps run sequentially; a fatal step error stops the run and earlier
//!   committed steps stay committed.
//! - A partially applied migration is reported, never marked complete.

use crate::config::CleanupConfig;
use crate::db::migrations::{migrate, MigrationOutcome};
use crate::db::DbError;
use crate::model::{DatabaseKind, Mode};
use crate::repair::inject::inject_statements;
use crate::repair::withdrawals::copy_withdrawals;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

pub mod classify;
pub mod manifest;

pub use classify::{classify_statement_files, ClassificationError, StatementFiles};
pub use manifest::{ManifestError, RunManifest, RunTargets};

pub type RunResult<T> = Result<T, RunError>;

/// One unit of work inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    InjectTransactions,
    InjectLogs,
    CopyWithdrawals,
    MigrateBlocks,
    MigrateTransactions,
    MigrateLogs,
}

const INJECT_STEPS: &[Step] = &[Step::InjectTransactions, Step::InjectLogs];
const COPY_STEPS: &[Step] = &[Step::CopyWithdrawals];
const MIGRATE_STEPS: &[Step] = &[
    Step::MigrateBlocks,
    Step::MigrateTransactions,
    Step::MigrateLogs,
];
const ALL_STEPS: &[Step] = &[
    Step::InjectTransactions,
    Step::InjectLogs,
    Step::CopyWithdrawals,
    Step::MigrateBlocks,
    Step::MigrateTransactions,
    Step::MigrateLogs,
];

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InjectTransactions => "inject_transactions",
            Self::InjectLogs => "inject_logs",
            Self::CopyWithdrawals => "copy_withdrawals",
            Self::MigrateBlocks => "migrate_blocks",
            Self::MigrateTransactions => "migrate_transactions",
            Self::MigrateLogs => "migrate_logs",
        }
    }

    fn needs_statement_files(self) -> bool {
        matches!(self, Self::InjectTransactions | Self::InjectLogs)
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered steps executed for `mode`.
pub fn steps_for(mode: Mode) -> &'static [Step] {
    match mode {
        Mode::All => ALL_STEPS,
        Mode::Inject => INJECT_STEPS,
        Mode::Copy => COPY_STEPS,
        Mode::Migrate => MIGRATE_STEPS,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Injected { statements: usize },
    Copied { rows: u64 },
    Migrated(MigrationOutcome),
    /// Finished by an earlier, interrupted run.
    Resumed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: Step,
    pub outcome: StepOutcome,
}

/// What a completed run did, step by step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: Mode,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    /// False when any migration was only partially applied.
    pub fn is_clean(&self) -> bool {
        !self.steps.iter().any(|report| {
            matches!(&report.outcome, StepOutcome::Migrated(outcome) if outcome.is_partial())
        })
    }

    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|report| report.step == step)
            .map(|report| &report.outcome)
    }
}

#[derive(Debug)]
pub enum RunError {
    Classification(ClassificationError),
    Manifest(ManifestError),
    Step { step: Step, source: DbError },
}

impl Display for RunError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classification(err) => write!(f, "{err}"),
            Self::Manifest(err) => write!(f, "{err}"),
            Self::Step { step, source } => write!(f, "step `{step}` failed: {source}"),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Classification(err) => Some(err),
            Self::Manifest(err) => Some(err),
            Self::Step { source, .. } => Some(source),
        }
    }
}

impl From<ClassificationError> for RunError {
    fn from(value: ClassificationError) -> Self {
        Self::Classification(value)
    }
}

impl From<ManifestError> for RunError {
    fn from(value: ManifestError) -> Self {
        Self::Manifest(value)
    }
}

/// Runs every step of `mode` against the databases named in `config`.
///
/// `Mode::All` resumes from `config.run_manifest` when a previous run was
/// interrupted, and removes the manifest after a clean finish.
pub fn run(config: &CleanupConfig, mode: Mode) -> RunResult<RunReport> {
    let started_at = Instant::now();
    let steps = steps_for(mode);

    let mut manifest = match mode {
        Mode::All => Some(RunManifest::load_or_new(
            &config.run_manifest,
            &RunTargets::from_config(config),
        )?),
        _ => None,
    };
    let run_id = manifest
        .as_ref()
        .map_or_else(Uuid::new_v4, |manifest| manifest.run_id);
    let is_done = |manifest: &Option<RunManifest>, step: Step| {
        manifest
            .as_ref()
            .is_some_and(|manifest| manifest.is_completed(step))
    };

    info!(
        "event=run module=run status=start run_id={} mode={} resumed={}",
        run_id,
        mode,
        manifest.as_ref().is_some_and(RunManifest::is_resumed)
    );

    let files = if steps
        .iter()
        .any(|step| step.needs_statement_files() && !is_done(&manifest, *step))
    {
        Some(classify_statement_files(&config.missing_statements)?)
    } else {
        None
    };

    let mut report = RunReport {
        run_id,
        mode,
        steps: Vec::with_capacity(steps.len()),
    };

    for &step in steps {
        if is_done(&manifest, step) {
            info!(
                "event=step module=run status=skip run_id={} step={} reason=resumed",
                run_id, step
            );
            report.steps.push(StepReport {
                step,
                outcome: StepOutcome::Resumed,
            });
            continue;
        }

        let outcome = execute_step(step, config, files.as_ref()).inspect_err(|err| {
            error!(
                "event=step module=run status=error run_id={} step={} error={}",
                run_id, step, err
            );
        })?;

        match &outcome {
            StepOutcome::Migrated(migration) if migration.is_partial() => {
                warn!(
                    "event=step module=run status=partial run_id={} step={}",
                    run_id, step
                );
            }
            _ => {
                info!(
                    "event=step module=run status=ok run_id={} step={}",
                    run_id, step
                );
                if let Some(manifest) = manifest.as_mut() {
                    manifest.mark_completed(step)?;
                }
            }
        }
        report.steps.push(StepReport { step, outcome });
    }

    if let Some(manifest) = manifest {
        if report.is_clean() {
            manifest.remove()?;
        } else {
            warn!(
                "event=run module=run status=partial run_id={} manifest={}",
                run_id,
                manifest.path().display()
            );
        }
    }

    info!(
        "event=run module=run status={} run_id={} mode={} duration_ms={}",
        if report.is_clean() { "ok" } else { "partial" },
        run_id,
        mode,
        started_at.elapsed().as_millis()
    );
    Ok(report)
}

fn execute_step(
    step: Step,
    config: &CleanupConfig,
    files: Option<&StatementFiles>,
) -> RunResult<StepOutcome> {
    let tmp_dir = config.tmp_dir.as_path();
    let policy = config.migration_policy;
    let step_error = |source| RunError::Step { step, source };

    let outcome = match step {
        Step::InjectTransactions => {
            let files = resolve_files(files, config)?;
            StepOutcome::Injected {
                statements: inject_statements(&config.tx_db, &files.transactions, tmp_dir)
                    .map_err(step_error)?,
            }
        }
        Step::InjectLogs => {
            let files = resolve_files(files, config)?;
            StepOutcome::Injected {
                statements: inject_statements(&config.logs_db, &files.logs, tmp_dir)
                    .map_err(step_error)?,
            }
        }
        Step::CopyWithdrawals => StepOutcome::Copied {
            rows: copy_withdrawals(&config.wdls_db, &config.blocks_db, tmp_dir)
                .map_err(step_error)?,
        },
        Step::MigrateBlocks => StepOutcome::Migrated(
            migrate(DatabaseKind::Blocks, &config.blocks_db, tmp_dir, policy)
                .map_err(step_error)?,
        ),
        Step::MigrateTransactions => StepOutcome::Migrated(
            migrate(DatabaseKind::Transactions, &config.tx_db, tmp_dir, policy)
                .map_err(step_error)?,
        ),
        Step::MigrateLogs => StepOutcome::Migrated(
            migrate(DatabaseKind::Logs, &config.logs_db, tmp_dir, policy).map_err(step_error)?,
        ),
    };
    Ok(outcome)
}

fn resolve_files<'a>(
    files: Option<&'a StatementFiles>,
    config: &CleanupConfig,
) -> RunResult<Cow<'a, StatementFiles>> {
    match files {
        Some(files) => Ok(Cow::Borrowed(files)),
        None => Ok(Cow::Owned(classify_statement_files(
            &config.missing_statements,
        )?)),
    }
}
