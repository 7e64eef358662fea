//! Shared statement-list executor.
//!
//! # Responsibility
//! - Run an ordered list of SQL statements on one connection.
//! - Make the error policy an explicit argument instead of a property of
//!   the caller.
//!
//! # Invariants
//! - Statements execute strictly in list order.
//! - `AbortOnFirstError` never executes a statement after a failed one.
//! - `ContinueAndReport` attempts every statement and records each failure.
//! - Transaction boundaries belong to the caller.

use super::{DbError, DbResult};
use crate::logging::sanitize_message;
use log::{debug, warn};
use rusqlite::Connection;

const MAX_LOGGED_STATEMENT_CHARS: usize = 200;

/// How statement failures are handled by [`apply_statements`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyPolicy {
    /// Stop at the first failure and return it as [`DbError::Statement`].
    AbortOnFirstError,
    /// Log the failure, keep going, and list it in the [`ApplyReport`].
    #[default]
    ContinueAndReport,
}

impl ApplyPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AbortOnFirstError => "abort",
            Self::ContinueAndReport => "continue",
        }
    }
}

/// One statement that failed under [`ApplyPolicy::ContinueAndReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFailure {
    /// Zero-based position in the applied list.
    pub index: usize,
    pub statement: String,
    pub error: String,
}

/// Summary of one [`apply_statements`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<StatementFailure>,
}

impl ApplyReport {
    /// True when every attempted statement succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Executes `statements` in order under `policy`.
///
/// `label` names the caller in log events (for example `migrate:blocks`).
pub fn apply_statements<S: AsRef<str>>(
    conn: &Connection,
    statements: &[S],
    policy: ApplyPolicy,
    label: &str,
) -> DbResult<ApplyReport> {
    let mut report = ApplyReport::default();

    for (index, statement) in statements.iter().enumerate() {
        let statement = statement.as_ref();
        report.attempted += 1;

        match conn.execute_batch(statement) {
            Ok(()) => {
                report.succeeded += 1;
                debug!(
                    "event=apply_statement module=db status=ok label={} index={}",
                    label, index
                );
            }
            Err(err) => {
                let logged = sanitize_message(statement.trim(), MAX_LOGGED_STATEMENT_CHARS);
                match policy {
                    ApplyPolicy::AbortOnFirstError => {
                        warn!(
                            "event=apply_statement module=db status=error policy=abort label={} index={} error={} statement={}",
                            label, index, err, logged
                        );
                        return Err(DbError::Statement {
                            index,
                            statement: statement.trim().to_string(),
                            source: err,
                        });
                    }
                    ApplyPolicy::ContinueAndReport => {
                        warn!(
                            "event=apply_statement module=db status=error policy=continue label={} index={} error={} statement={}",
                            label, index, err, logged
                        );
                        report.failures.push(StatementFailure {
                            index,
                            statement: statement.trim().to_string(),
                            error: err.to_string(),
                        });
                    }
                }
            }
        }
    }

    Ok(report)
}

/// Splits `;`-delimited SQL text into executable fragments.
///
/// Fragments that are empty or whitespace-only are dropped, which covers the
/// trailing fragment after the final delimiter and empty input. Semicolons
/// inside string literals are not recognised.
pub fn split_statements(text: &str) -> Vec<&str> {
    text.split(';')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{apply_statements, split_statements, ApplyPolicy};
    use crate::db::DbError;
    use rusqlite::Connection;

    fn row_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn split_drops_trailing_and_blank_fragments() {
        let text = "INSERT INTO t VALUES (1);\n  ;\nINSERT INTO t VALUES (2);\n";
        assert_eq!(
            split_statements(text),
            vec!["INSERT INTO t VALUES (1)", "INSERT INTO t VALUES (2)"]
        );
        assert!(split_statements("").is_empty());
        assert!(split_statements(" ;\n; ").is_empty());
    }

    #[test]
    fn split_keeps_final_statement_without_delimiter() {
        assert_eq!(split_statements("SELECT 1; SELECT 2"), vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn abort_policy_stops_at_first_failure() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER);").unwrap();

        let statements = [
            "INSERT INTO t VALUES (1)",
            "INSERT INTO missing_table VALUES (2)",
            "INSERT INTO t VALUES (3)",
        ];
        let err = apply_statements(&conn, &statements, ApplyPolicy::AbortOnFirstError, "test")
            .unwrap_err();

        match err {
            DbError::Statement { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(row_count(&conn), 1);
    }

    #[test]
    fn continue_policy_attempts_everything_and_reports() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER);").unwrap();

        let statements = [
            "INSERT INTO t VALUES (1)",
            "INSERT INTO missing_table VALUES (2)",
            "INSERT INTO t VALUES (3)",
        ];
        let report =
            apply_statements(&conn, &statements, ApplyPolicy::ContinueAndReport, "test").unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert!(report.failures[0].error.contains("missing_table"));
        assert!(!report.is_clean());
        assert_eq!(row_count(&conn), 2);
    }
}
