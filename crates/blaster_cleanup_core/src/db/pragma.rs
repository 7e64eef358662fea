//! Temp-directory pragma for heavy sorts and index builds.

use super::{DbError, DbResult};
use log::{debug, error};
use rusqlite::Connection;
use std::path::Path;

/// Points the connection's temporary spill files at `dir`.
///
/// Must run before any data-mutating statement on the connection. A path
/// that is not an existing directory, or any SQLite failure, is returned as
/// [`DbError::TempDir`] and never ignored.
pub fn set_temp_dir(conn: &Connection, dir: &Path) -> DbResult<()> {
    let fail = |reason: String| {
        error!(
            "event=temp_dir module=db status=error dir={} error={}",
            dir.display(),
            reason
        );
        DbError::TempDir {
            dir: dir.to_path_buf(),
            reason,
        }
    };

    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(fail("not a directory".to_string())),
        Err(err) => return Err(fail(err.to_string())),
    }

    let Some(dir_str) = dir.to_str() else {
        return Err(fail("path is not valid UTF-8".to_string()));
    };

    conn.execute_batch(&format!(
        "PRAGMA temp_store_directory = '{}';",
        dir_str.replace('\'', "''")
    ))
    .map_err(|err| fail(err.to_string()))?;

    debug!("event=temp_dir module=db status=ok dir={}", dir.display());
    Ok(())
}
