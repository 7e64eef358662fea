mod common;

use blaster_cleanup_core::{inject_statements, DbError};
use common::{count_rows, Workspace};

#[test]
fn injects_every_statement_in_order() {
    let ws = Workspace::new();
    let file = ws.write_statements(
        "tx_fix.sql",
        "INSERT INTO transactions (hash, block) VALUES ('0xa', 10);
         INSERT INTO transactions (hash, block) VALUES ('0xb', 11);
         UPDATE transactions SET recipient = '0xr' WHERE hash = '0xb';\n",
    );

    let applied = inject_statements(&ws.config.tx_db, &file, &ws.config.tmp_dir).unwrap();

    assert_eq!(applied, 3);
    assert_eq!(count_rows(&ws.config.tx_db, "transactions"), 2);
    assert_eq!(
        count_rows(
            &ws.config.tx_db,
            "transactions WHERE recipient = '0xr' AND hash = '0xb'"
        ),
        1
    );
}

#[test]
fn malformed_statement_aborts_and_keeps_nothing() {
    let ws = Workspace::new();
    let file = ws.write_statements(
        "lo_fix.sql",
        "INSERT INTO event_logs (address, block, logIndex) VALUES ('0x1', 1, 0);
         INSERT INTO event_logs (address, block, logIndex VALUES ('0x2', 1, 1);
         INSERT INTO event_logs (address, block, logIndex) VALUES ('0x3', 1, 2);",
    );

    let err = inject_statements(&ws.config.logs_db, &file, &ws.config.tmp_dir).unwrap_err();

    match err {
        DbError::Statement { index, .. } => assert_eq!(index, 1),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count_rows(&ws.config.logs_db, "event_logs"), 0);
}

#[test]
fn constraint_violation_is_fatal() {
    let ws = Workspace::new();
    let file = ws.write_statements(
        "lo_fix.sql",
        "INSERT INTO event_logs (address, block, logIndex) VALUES ('0x1', 1, 0);
         INSERT INTO event_logs (address, block, logIndex) VALUES ('0x1', 1, 0);",
    );

    let err = inject_statements(&ws.config.logs_db, &file, &ws.config.tmp_dir).unwrap_err();

    assert!(matches!(err, DbError::Statement { index: 1, .. }));
    assert_eq!(count_rows(&ws.config.logs_db, "event_logs"), 0);
}

#[test]
fn empty_file_is_a_no_op() {
    let ws = Workspace::new();
    let empty = ws.write_statements("tx_empty.sql", "");
    let blank = ws.write_statements("tx_blank.sql", "\n ; \n");

    assert_eq!(
        inject_statements(&ws.config.tx_db, &empty, &ws.config.tmp_dir).unwrap(),
        0
    );
    assert_eq!(
        inject_statements(&ws.config.tx_db, &blank, &ws.config.tmp_dir).unwrap(),
        0
    );
    assert_eq!(count_rows(&ws.config.tx_db, "transactions"), 0);
}

#[test]
fn missing_statement_file_is_reported() {
    let ws = Workspace::new();
    let err = inject_statements(
        &ws.config.tx_db,
        &ws.config.missing_statements.join("tx_absent.sql"),
        &ws.config.tmp_dir,
    )
    .unwrap_err();

    assert!(matches!(err, DbError::StatementFile { .. }));
}

#[test]
fn bad_temp_dir_prevents_injection() {
    let ws = Workspace::new();
    let file = ws.write_statements(
        "tx_fix.sql",
        "INSERT INTO transactions (hash, block) VALUES ('0xa', 10);",
    );

    let err = inject_statements(&ws.config.tx_db, &file, &ws.dir.path().join("nope")).unwrap_err();

    assert!(matches!(err, DbError::TempDir { .. }));
    assert_eq!(count_rows(&ws.config.tx_db, "transactions"), 0);
}
