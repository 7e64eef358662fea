//! Connection bootstrap for target and source databases.

use super::pragma::set_temp_dir;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens an existing database for writing and applies the temp-directory
/// pragma.
///
/// The file is never created: a missing path returns
/// [`DbError::MissingDatabase`].
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_target(path: &Path, tmp_dir: &Path) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode=read_write path={}",
        path.display()
    );

    let result = open_existing(path, OpenFlags::SQLITE_OPEN_READ_WRITE).and_then(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        set_temp_dir(&conn, tmp_dir)?;
        Ok(conn)
    });

    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode=read_write path={} duration_ms={}",
            path.display(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode=read_write path={} duration_ms={} error={}",
            path.display(),
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

/// Opens an existing database read-only.
pub fn open_source_read_only(path: &Path) -> DbResult<Connection> {
    let conn = open_existing(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    info!(
        "event=db_open module=db status=ok mode=read_only path={}",
        path.display()
    );
    Ok(conn)
}

fn open_existing(path: &Path, access: OpenFlags) -> DbResult<Connection> {
    if !path.is_file() {
        return Err(DbError::MissingDatabase(path.to_path_buf()));
    }
    let flags = access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Ok(Connection::open_with_flags(path, flags)?)
}
