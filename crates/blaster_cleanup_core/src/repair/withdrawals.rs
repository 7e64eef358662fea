//! Withdrawals consolidation into the blocks database.
//!
//! # Invariants
//! - The destination table is created fresh; an existing one is an error.
//! - Destination primary key is `(block, wtdrlIndex)` on a `WITHOUT ROWID`
//!   table, so a duplicate pair in the source fails the copy.
//! - Rows are moved with one set-based `INSERT ... SELECT`.

use crate::db::{open_source_read_only, open_target, DbError, DbResult};
use log::info;
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;

const SOURCE_ALIAS: &str = "wdls";

// Source column names written by the blaster do not match its data layout,
// so the copy relies on column position: block, withdrawal index, validator
// index, address, amount, block hash.
const CREATE_WITHDRAWALS_SQL: &str = "CREATE TABLE main.withdrawals (
    block      BIGINT,
    wtdrlIndex MEDIUMINT,
    vldtrIndex MEDIUMINT,
    address    VARCHAR(20),
    amount     BIGINT,
    blockHash  VARCHAR(32),
    PRIMARY KEY (block, wtdrlIndex)
) WITHOUT ROWID;";

const COPY_COLUMNS: &str = "block, wtdrlIndex, vldtrIndex, address, amount, blockHash";

/// Copies every withdrawals row from `wdls_db` into a new table in
/// `blocks_db`. Returns the number of copied rows.
///
/// # Errors
/// - [`DbError::TableExists`] when the blocks database already has a
///   `withdrawals` table.
/// - A SQLite constraint error when the source holds a duplicate
///   `(block, wtdrlIndex)` pair; nothing is written in that case.
/// - [`DbError::RowCountMismatch`] when the inserted count differs from the
///   source count.
/// - [`DbError::NonUtf8Path`] when `wdls_db` cannot be attached by name.
pub fn copy_withdrawals(wdls_db: &Path, blocks_db: &Path, tmp_dir: &Path) -> DbResult<u64> {
    let started_at = Instant::now();
    let source_path = wdls_db
        .to_str()
        .ok_or_else(|| DbError::NonUtf8Path(wdls_db.to_path_buf()))?;

    let source = open_source_read_only(wdls_db)?;
    let expected = count_rows(&source)?;
    drop(source);

    let mut dest = open_target(blocks_db, tmp_dir)?;
    if table_exists(&dest, "withdrawals")? {
        return Err(DbError::TableExists {
            table: "withdrawals",
            path: blocks_db.to_path_buf(),
        });
    }

    info!(
        "event=copy_withdrawals module=repair status=start source={} dest={} rows={}",
        wdls_db.display(),
        blocks_db.display(),
        expected
    );

    dest.execute(&format!("ATTACH DATABASE ?1 AS {SOURCE_ALIAS};"), [source_path])?;

    let copied = copy_attached(&mut dest, expected);
    let detached = dest.execute_batch(&format!("DETACH DATABASE {SOURCE_ALIAS};"));
    let copied = copied?;
    detached?;

    info!(
        "event=copy_withdrawals module=repair status=ok rows={} duration_ms={}",
        copied,
        started_at.elapsed().as_millis()
    );
    Ok(copied)
}

fn copy_attached(dest: &mut Connection, expected: u64) -> DbResult<u64> {
    let tx = dest.transaction()?;
    tx.execute_batch(CREATE_WITHDRAWALS_SQL)?;
    let copied = tx.execute(
        &format!(
            "INSERT INTO main.withdrawals ({COPY_COLUMNS}) SELECT * FROM {SOURCE_ALIAS}.withdrawals;"
        ),
        [],
    )? as u64;
    if copied != expected {
        return Err(DbError::RowCountMismatch { expected, copied });
    }
    tx.commit()?;
    Ok(copied)
}

fn count_rows(conn: &Connection) -> DbResult<u64> {
    let count = conn.query_row("SELECT COUNT(*) FROM withdrawals;", [], |row| {
        row.get::<_, i64>(0)
    })?;
    Ok(count as u64)
}

fn table_exists(conn: &Connection, name: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM main.sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [name],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
