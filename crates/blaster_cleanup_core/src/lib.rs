//! Post-indexing transformation of blaster-produced SQLite databases.
//!
//! Brings the blocks, transactions and logs databases up to their target
//! schema versions, replays missing statement files and consolidates the
//! withdrawals table into the blocks database.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repair;
pub mod run;

pub use config::{load_config, CleanupConfig, ConfigError};
pub use db::migrations::{migrate, MigrationOutcome, MigrationSet};
pub use db::statements::{ApplyPolicy, ApplyReport, StatementFailure};
pub use db::{DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{DatabaseKind, Mode};
pub use repair::inject::inject_statements;
pub use repair::withdrawals::copy_withdrawals;
pub use run::{run, RunError, RunReport, Step, StepOutcome};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
