//! Versioned schema sets and their executor.
//!
//! # Responsibility
//! - Hold one statement set per migratable database kind.
//! - Apply a set only when the database's recorded version is below it.
//!
//! # Invariants
//! - The `migrations` table is owned by the engine, not by the sets.
//! - Statements of a set run in listed order inside one transaction.
//! - The version marker row is written only when every statement succeeded.
//! - A `CREATE` whose object already existed before the attempt started is
//!   treated as done, so a retry after a partial attempt can converge.
//! - `withdrawals` has no set; that database is consumed by the copy step.

use super::statements::{apply_statements, split_statements, ApplyPolicy, StatementFailure};
use super::{open_target, DbError, DbResult};
use crate::model::DatabaseKind;
use log::{debug, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;

const MIGRATIONS_TABLE_SQL: &str =
    "CREATE TABLE IF NOT EXISTS migrations (version integer PRIMARY KEY);";

const BLOCKS_SET: MigrationSet = MigrationSet {
    kind: DatabaseKind::Blocks,
    version: 4,
    sql: include_str!("0004_blocks.sql"),
};

const TRANSACTIONS_SET: MigrationSet = MigrationSet {
    kind: DatabaseKind::Transactions,
    version: 2,
    sql: include_str!("0002_transactions.sql"),
};

const LOGS_SET: MigrationSet = MigrationSet {
    kind: DatabaseKind::Logs,
    version: 3,
    sql: include_str!("0003_logs.sql"),
};

/// A fixed list of DDL statements that brings one database kind to `version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationSet {
    pub kind: DatabaseKind,
    pub version: u32,
    /// `;`-delimited statements, applied in order.
    pub sql: &'static str,
}

impl MigrationSet {
    pub const fn new(kind: DatabaseKind, version: u32, sql: &'static str) -> Self {
        Self { kind, version, sql }
    }

    pub fn statements(&self) -> Vec<&'static str> {
        split_statements(self.sql)
    }
}

/// Result of applying one set to one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Every statement succeeded and `version` was recorded.
    Applied { version: u32 },
    /// The database already records `current >= target`; nothing ran.
    AlreadyCurrent { current: u32, target: u32 },
    /// Some statements failed; the successful ones were committed and the
    /// version marker was withheld.
    Partial {
        target: u32,
        failures: Vec<StatementFailure>,
    },
}

impl MigrationOutcome {
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Partial { .. })
    }
}

/// Returns the built-in set for `kind`, or `None` for withdrawals.
pub fn migration_set(kind: DatabaseKind) -> Option<MigrationSet> {
    match kind {
        DatabaseKind::Blocks => Some(BLOCKS_SET),
        DatabaseKind::Transactions => Some(TRANSACTIONS_SET),
        DatabaseKind::Logs => Some(LOGS_SET),
        DatabaseKind::Withdrawals => None,
    }
}

/// Opens the database at `path` and applies the built-in set for `kind`.
///
/// # Errors
/// - [`DbError::NoMigrationSet`] for [`DatabaseKind::Withdrawals`].
/// - Open and temp-directory failures abort before any statement runs.
/// - Under [`ApplyPolicy::AbortOnFirstError`] the first failing statement is
///   returned and the set is rolled back.
pub fn migrate(
    kind: DatabaseKind,
    path: &Path,
    tmp_dir: &Path,
    policy: ApplyPolicy,
) -> DbResult<MigrationOutcome> {
    let set = migration_set(kind).ok_or(DbError::NoMigrationSet(kind))?;
    let mut conn = open_target(path, tmp_dir)?;
    apply_migration_set(&mut conn, &set, policy)
}

/// Applies `set` on an already configured connection.
pub fn apply_migration_set(
    conn: &mut Connection,
    set: &MigrationSet,
    policy: ApplyPolicy,
) -> DbResult<MigrationOutcome> {
    let started_at = Instant::now();
    conn.execute_batch(MIGRATIONS_TABLE_SQL)?;

    let current = current_version(conn)?;
    if current >= set.version {
        info!(
            "event=migrate module=migrations status=skip kind={} current={} target={}",
            set.kind, current, set.version
        );
        return Ok(MigrationOutcome::AlreadyCurrent {
            current,
            target: set.version,
        });
    }

    info!(
        "event=migrate module=migrations status=start kind={} current={} target={} policy={}",
        set.kind,
        current,
        set.version,
        policy.as_str()
    );

    let mut positions = Vec::new();
    let mut pending = Vec::new();
    for (index, statement) in set.statements().into_iter().enumerate() {
        if let Some((object_type, name)) = created_object(statement) {
            if object_exists(conn, object_type, name)? {
                debug!(
                    "event=migrate module=migrations status=present kind={} index={} {}={}",
                    set.kind, index, object_type, name
                );
                continue;
            }
        }
        positions.push(index);
        pending.push(statement);
    }
    let present = set.statements().len() - pending.len();

    let label = format!("migrate:{}", set.kind);
    let tx = conn.transaction()?;
    // Failure indexes refer to positions in the full set.
    let mut report = apply_statements(&tx, &pending, policy, &label).map_err(|err| match err {
        DbError::Statement {
            index,
            statement,
            source,
        } => DbError::Statement {
            index: positions[index],
            statement,
            source,
        },
        other => other,
    })?;
    for failure in &mut report.failures {
        failure.index = positions[failure.index];
    }
    if report.is_clean() {
        tx.execute(
            "INSERT INTO migrations(version) VALUES (?1);",
            [set.version],
        )?;
    }
    tx.commit()?;

    if report.is_clean() {
        info!(
            "event=migrate module=migrations status=ok kind={} version={} statements={} present={} duration_ms={}",
            set.kind,
            set.version,
            report.succeeded,
            present,
            started_at.elapsed().as_millis()
        );
        Ok(MigrationOutcome::Applied {
            version: set.version,
        })
    } else {
        warn!(
            "event=migrate module=migrations status=partial kind={} target={} failed={} succeeded={} duration_ms={}",
            set.kind,
            set.version,
            report.failures.len(),
            report.succeeded,
            started_at.elapsed().as_millis()
        );
        Ok(MigrationOutcome::Partial {
            target: set.version,
            failures: report.failures,
        })
    }
}

/// Object type and name created by a `CREATE TABLE` or `CREATE INDEX`
/// statement; `None` for anything else.
fn created_object(statement: &str) -> Option<(&'static str, &str)> {
    let mut words = statement.split_whitespace();
    if !words.next()?.eq_ignore_ascii_case("CREATE") {
        return None;
    }
    let mut word = words.next()?;
    if word.eq_ignore_ascii_case("UNIQUE") {
        word = words.next()?;
    }
    let object_type = if word.eq_ignore_ascii_case("TABLE") {
        "table"
    } else if word.eq_ignore_ascii_case("INDEX") {
        "index"
    } else {
        return None;
    };

    let mut name = words.next()?;
    if name.eq_ignore_ascii_case("IF") {
        words.next()?;
        words.next()?;
        name = words.next()?;
    }
    let name = name
        .split('(')
        .next()?
        .trim_matches(|c| matches!(c, '"' | '`' | '[' | ']'));
    (!name.is_empty()).then_some((object_type, name))
}

fn object_exists(conn: &Connection, object_type: &str, name: &str) -> DbResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2 COLLATE NOCASE
        );",
        [object_type, name],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(exists)
}

/// Highest recorded version, or 0 when none.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations;",
        [],
        |row| row.get::<_, u32>(0),
    )?;
    Ok(version)
}
