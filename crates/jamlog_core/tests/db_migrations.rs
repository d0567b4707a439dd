use jamlog_core::db::migrations::latest_version;
use jamlog_core::db::{open_db, open_db_in_memory, verify_schema_tables, DbError};
use jamlog_core::{
    AttributeAccess, AttributeKind, AttributeSpec, EntitySpec, PersistenceController, Schema,
    StoreConfig,
};
use rusqlite::Connection;

const SONG_ATTRIBUTES: &[AttributeSpec] = &[AttributeSpec {
    name: "id",
    column: "id",
    kind: AttributeKind::Uuid,
    access: AttributeAccess::ReadOnly,
}];
const UNMIGRATED_ENTITIES: &[EntitySpec] = &[EntitySpec {
    name: "Song",
    table: "songs",
    touch_column: None,
    attributes: SONG_ATTRIBUTES,
}];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "posts");
    assert_table_exists(&conn, "sync_outbox");
}

#[test]
fn reopening_durable_store_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jamlog.sqlite3");

    let first = open_db(&path).unwrap();
    assert_eq!(schema_version(&first), latest_version());
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    assert_table_exists(&second, "posts");
}

#[test]
fn opening_store_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_matches_migrated_tables() {
    let conn = open_db_in_memory().unwrap();
    verify_schema_tables(&conn, &Schema::jamlog()).unwrap();
}

#[test]
fn opening_with_schema_for_unmigrated_table_is_rejected() {
    let config = StoreConfig::in_memory().with_schema(Schema::new(UNMIGRATED_ENTITIES));

    match PersistenceController::open(config) {
        Err(DbError::InvalidSchema(detail)) => assert!(detail.contains("songs")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("schema without tables must not open"),
    }
}

#[test]
#[should_panic(expected = "unresolved store error")]
fn open_or_abort_fails_fast_on_incompatible_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    PersistenceController::open_or_abort(StoreConfig::file(&path));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
