//! Missing-statement injection.

use crate::db::statements::{apply_statements, split_statements, ApplyPolicy};
use crate::db::{open_target, DbError, DbResult};
use log::info;
use std::path::Path;
use std::time::Instant;

/// Replays a `;`-delimited statement file into the database at `db_path`.
///
/// Statements run in one transaction under
/// [`ApplyPolicy::AbortOnFirstError`]: the first failure is returned and no
/// statement of the file is kept. An empty file is a no-op.
///
/// Returns the number of executed statements.
pub fn inject_statements(db_path: &Path, statement_file: &Path, tmp_dir: &Path) -> DbResult<usize> {
    let started_at = Instant::now();
    let mut conn = open_target(db_path, tmp_dir)?;

    let text = std::fs::read_to_string(statement_file).map_err(|source| DbError::StatementFile {
        path: statement_file.to_path_buf(),
        source,
    })?;
    let statements = split_statements(&text);

    info!(
        "event=inject module=repair status=start db={} file={} statements={}",
        db_path.display(),
        statement_file.display(),
        statements.len()
    );

    if statements.is_empty() {
        info!(
            "event=inject module=repair status=skip db={} reason=empty_file",
            db_path.display()
        );
        return Ok(0);
    }

    let label = format!("inject:{}", statement_file.display());
    let tx = conn.transaction()?;
    let report = apply_statements(&tx, &statements, ApplyPolicy::AbortOnFirstError, &label)?;
    tx.commit()?;

    info!(
        "event=inject module=repair status=ok db={} statements={} duration_ms={}",
        db_path.display(),
        report.succeeded,
        started_at.elapsed().as_millis()
    );
    Ok(report.succeeded)
}
