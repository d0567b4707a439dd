//! Connection bootstrap for durable and in-memory stores.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a busy timeout.
//! - Returned connections have migrations fully applied.
//! - Every in-memory connection is a private database; nothing is shared
//!   between two of them.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use crate::model::schema::Schema;
use log::{error, info};
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (or creates) a durable store file and applies pending migrations.
///
/// # Side effects
/// - Creates the file when it does not exist yet.
/// - Emits `db_open` events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path))
}

/// Opens a throwaway in-memory store and applies all migrations.
///
/// State written through the returned connection is gone once it is dropped.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = connect().map_err(|err| {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={err}",
            started_at.elapsed().as_millis()
        );
        err
    })?;

    if let Err(err) = bootstrap_connection(&mut conn) {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={err}",
            started_at.elapsed().as_millis()
        );
        return Err(err);
    }

    info!(
        "event=db_open module=db status=ok mode={mode} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)?;
    Ok(())
}

/// Checks that every declared table and column exists on `conn`.
///
/// # Errors
/// Returns `DbError::InvalidSchema` naming the first missing table or column.
pub fn verify_schema_tables(conn: &Connection, schema: &Schema) -> DbResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    for entity in schema.entities() {
        let columns = stmt
            .query_map([entity.table], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        if columns.is_empty() {
            return Err(DbError::InvalidSchema(format!(
                "entity `{}` maps to missing table `{}`",
                entity.name, entity.table
            )));
        }

        let declared = entity
            .attributes
            .iter()
            .map(|attr| attr.column)
            .chain(entity.touch_column);
        for column in declared {
            if !columns.contains(column) {
                return Err(DbError::InvalidSchema(format!(
                    "entity `{}` maps to missing column `{}.{column}`",
                    entity.name, entity.table
                )));
            }
        }
    }
    Ok(())
}
