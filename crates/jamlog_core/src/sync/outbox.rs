//! Sync outbox storage.
//!
//! # Invariants
//! - Entries are listed in commit order (`seq` ascending).
//! - At most one entry per `(entity, record_id, attribute)`: a newer write
//!   replaces the older entry and moves to the end of the queue, so
//!   acknowledging a stale `seq` never drops a newer write.
//! - Record creation is queued under the `id` attribute; receivers replay it
//!   with `PersistenceController::merge_remote_record`.
//! - Only local writes are queued; merged remote changes never are.
//! - Entries hold addresses, not values: a provider reads the current value
//!   when it pushes.

use crate::db::NOW_MS_SQL;
use crate::model::value::AttributeValue;
use crate::repo::attribute_repo::{StoreError, StoreResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::Serialize;
use uuid::Uuid;

/// One queued local change awaiting propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingChange {
    pub seq: i64,
    pub entity: String,
    pub record_id: Uuid,
    pub attribute: String,
    /// Unix epoch milliseconds.
    pub changed_at: i64,
}

/// Attribute change received from another device.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteChange {
    pub entity: String,
    pub record_id: Uuid,
    pub attribute: String,
    pub value: AttributeValue,
}

/// How a remote record was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMerge {
    /// The record was new to this store.
    Inserted,
    /// The record already existed; the given attributes were overwritten.
    Updated,
}

/// Queues one change, replacing any pending entry for the same address.
pub fn enqueue_change(
    conn: &Connection,
    entity: &str,
    record_id: Uuid,
    attribute: &str,
) -> StoreResult<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO sync_outbox (entity, record_id, attribute, changed_at)
             VALUES (?1, ?2, ?3, {NOW_MS_SQL});"
        ),
        params![entity, record_id.to_string(), attribute],
    )?;
    Ok(())
}

/// Lists queued changes oldest first.
pub fn list_pending(conn: &Connection, limit: Option<u32>) -> StoreResult<Vec<PendingChange>> {
    let mut sql = "SELECT seq, entity, record_id, attribute, changed_at
         FROM sync_outbox
         ORDER BY seq ASC"
        .to_string();
    let mut bind_values: Vec<Value> = Vec::new();
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut changes = Vec::new();
    while let Some(row) = rows.next()? {
        changes.push(parse_pending_row(row)?);
    }

    Ok(changes)
}

/// Removes pushed entries; unknown sequence numbers are ignored.
///
/// Returns how many entries were removed.
pub fn acknowledge(conn: &Connection, seqs: &[i64]) -> StoreResult<usize> {
    let mut removed = 0;
    for seq in seqs {
        removed += conn.execute("DELETE FROM sync_outbox WHERE seq = ?1;", [seq])?;
    }
    Ok(removed)
}

fn parse_pending_row(row: &Row<'_>) -> StoreResult<PendingChange> {
    let record_text: String = row.get("record_id")?;
    let record_id = Uuid::parse_str(&record_text).map_err(|_| {
        StoreError::InvalidData("malformed uuid in sync_outbox.record_id".to_string())
    })?;

    Ok(PendingChange {
        seq: row.get("seq")?,
        entity: row.get("entity")?,
        record_id,
        attribute: row.get("attribute")?,
        changed_at: row.get("changed_at")?,
    })
}
