#![allow(dead_code)]

use blaster_cleanup_core::{ApplyPolicy, CleanupConfig};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const BLOCKS_SCHEMA: &str = "CREATE TABLE blocks (
    number      BIGINT PRIMARY KEY,
    hash        varchar(32) UNIQUE,
    parentHash  varchar(32),
    coinbase    varchar(20),
    time        BIGINT,
    size        BIGINT
);";

pub const TRANSACTIONS_SCHEMA: &str = "CREATE TABLE transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hash varchar(32) UNIQUE,
    nonce BIGINT,
    recipient varchar(20),
    sender varchar(20),
    contractAddress varchar(20),
    block BIGINT
);";

pub const LOGS_SCHEMA: &str = "CREATE TABLE event_logs (
    address varchar(20),
    topic0 varchar(32),
    topic1 varchar(32),
    topic2 varchar(32),
    topic3 varchar(32),
    data blob,
    block BIGINT,
    logIndex MEDIUMINT,
    PRIMARY KEY (block, logIndex)
);";

/// Source layout as written by the blaster: no key, positional columns.
pub const WITHDRAWALS_SOURCE_SCHEMA: &str = "CREATE TABLE withdrawals (
    block BIGINT,
    wtdrlIndex MEDIUMINT,
    vldtrIndex MEDIUMINT,
    address VARCHAR(20),
    amount BIGINT,
    blockHash VARCHAR(32)
);";

/// Temp directory holding all four databases, a statements dir and a tmp dir.
pub struct Workspace {
    pub dir: TempDir,
    pub config: CleanupConfig,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = CleanupConfig {
            blocks_db: root.join("blocks.sqlite"),
            tx_db: root.join("transactions.sqlite"),
            logs_db: root.join("logs.sqlite"),
            wdls_db: root.join("withdrawals.sqlite"),
            missing_statements: root.join("missing"),
            tmp_dir: root.join("tmp"),
            migration_policy: ApplyPolicy::ContinueAndReport,
            run_manifest: root.join("tmp").join("run.json"),
        };
        std::fs::create_dir(&config.missing_statements).unwrap();
        std::fs::create_dir(&config.tmp_dir).unwrap();

        create_db(&config.blocks_db, BLOCKS_SCHEMA);
        seed_blocks(&config.blocks_db, 3);
        create_db(&config.tx_db, TRANSACTIONS_SCHEMA);
        create_db(&config.logs_db, LOGS_SCHEMA);
        create_db(&config.wdls_db, WITHDRAWALS_SOURCE_SCHEMA);
        seed_withdrawals(&config.wdls_db, &[(1, 0), (1, 1), (2, 2)]);

        Self { dir, config }
    }

    pub fn write_statements(&self, name: &str, text: &str) -> PathBuf {
        let path = self.config.missing_statements.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }
}

pub fn create_db(path: &Path, schema: &str) {
    Connection::open(path).unwrap().execute_batch(schema).unwrap();
}

pub fn seed_blocks(path: &Path, count: i64) {
    let conn = Connection::open(path).unwrap();
    for number in 0..count {
        conn.execute(
            "INSERT INTO blocks (number, hash, coinbase, time) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                number,
                format!("0xhash{number}"),
                "0xminer",
                1_700_000_000 + number
            ],
        )
        .unwrap();
    }
}

/// Inserts `(block, withdrawal index)` pairs with derived filler columns.
pub fn seed_withdrawals(path: &Path, keys: &[(i64, i64)]) {
    let conn = Connection::open(path).unwrap();
    for (block, index) in keys {
        conn.execute(
            "INSERT INTO withdrawals VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                block,
                index,
                100 + index,
                format!("0xaddr{index}"),
                32_000_000_000_i64,
                format!("0xhash{block}")
            ],
        )
        .unwrap();
    }
}

pub fn count_rows(path: &Path, table: &str) -> i64 {
    Connection::open(path)
        .unwrap()
        .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
            row.get(0)
        })
        .unwrap()
}

pub fn schema_object_exists(path: &Path, kind: &str, name: &str) -> bool {
    let exists: i64 = Connection::open(path)
        .unwrap()
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    exists == 1
}

/// Recorded migration versions, ascending; empty when the table is absent.
pub fn recorded_versions(path: &Path) -> Vec<u32> {
    if !schema_object_exists(path, "table", "migrations") {
        return Vec::new();
    }
    let conn = Connection::open(path).unwrap();
    let mut stmt = conn
        .prepare("SELECT version FROM migrations ORDER BY version;")
        .unwrap();
    let versions = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<u32>, _>>()
        .unwrap();
    versions
}
