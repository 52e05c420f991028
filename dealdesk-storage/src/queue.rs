//! Mutation queue: durable FIFO of writes awaiting remote confirmation.
//!
//! Entries are only removed once the remote store has applied them, so an
//! interrupted drain leaves them in place to be retried. Order is insertion
//! order (an autoincrement sequence), independent of the entry ids.

use crate::error::StorageResult;
use crate::refs::{referenced_ids, replace_id_refs};
use crate::store::LocalStore;
use crate::{from_millis, now_millis};
use chrono::{DateTime, Utc};
use dealdesk_model::{RecordId, Table};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use uuid::Uuid;

/// Kind of queued write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationAction {
    Create,
    Update,
    Delete,
}

impl MutationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationAction::Create => "create",
            MutationAction::Update => "update",
            MutationAction::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(MutationAction::Create),
            "update" => Ok(MutationAction::Update),
            "delete" => Ok(MutationAction::Delete),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// A pending write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMutation {
    /// Unique, time-ordered entry id.
    pub id: String,
    pub table: Table,
    pub action: MutationAction,
    /// The record the write targets.
    pub record_id: RecordId,
    /// Full record for create, partial fields for update, `{id}` for delete.
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl QueuedMutation {
    /// Ids of other records this payload points at through `*_id` fields.
    pub fn references(&self) -> Vec<RecordId> {
        payload_references(&self.payload)
    }
}

/// Ids of the records a JSON record or patch points at through its `*_id`
/// fields. The record's own `id` is not included.
pub fn payload_references(payload: &Value) -> Vec<RecordId> {
    referenced_ids(payload)
        .into_iter()
        .map(RecordId::parse)
        .collect()
}

/// One queue row as read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEntry {
    Ready(QueuedMutation),
    /// A row that could not be decoded. It is never replayed.
    Malformed { id: String, reason: String },
}

/// Durable FIFO of pending mutations.
#[derive(Clone)]
pub struct MutationQueue {
    store: LocalStore,
}

impl MutationQueue {
    pub(crate) fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Appends a mutation and returns its id.
    pub fn add_to_sync_queue(
        &self,
        table: Table,
        action: MutationAction,
        record_id: &RecordId,
        payload: &Value,
    ) -> StorageResult<String> {
        let conn = self.store.lock_conn();
        insert_entry(&conn, table, action, record_id, payload)
    }

    /// All decodable entries in insertion order. Malformed rows are logged
    /// and left out.
    pub fn get_sync_queue(&self) -> StorageResult<Vec<QueuedMutation>> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter_map(|entry| match entry {
                QueueEntry::Ready(m) => Some(m),
                QueueEntry::Malformed { id, reason } => {
                    warn!(queue_id = %id, "malformed queue entry: {reason}");
                    None
                }
            })
            .collect())
    }

    /// Every row in insertion order, including malformed ones.
    pub fn snapshot(&self) -> StorageResult<Vec<QueueEntry>> {
        let conn = self.store.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT id, table_name, action, record_id, data_json, created_at
             FROM sync_queue ORDER BY seq",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(id, table, action, record_id, json, created_at)| {
                decode_entry(id, &table, &action, &record_id, &json, created_at)
            })
            .collect())
    }

    /// Removes one entry. Removing a missing entry is not an error.
    pub fn remove_from_sync_queue(&self, id: &str) -> StorageResult<()> {
        let conn = self.store.lock_conn();
        remove_entry(&conn, id)
    }

    /// Empties the queue. Administrative reset only; pending writes are lost.
    pub fn clear_sync_queue(&self) -> StorageResult<usize> {
        let conn = self.store.lock_conn();
        let removed = conn.execute("DELETE FROM sync_queue", [])?;
        warn!(removed, "sync queue cleared");
        Ok(removed)
    }

    /// Number of rows in the queue, malformed ones included.
    pub fn len(&self) -> StorageResult<usize> {
        let conn = self.store.lock_conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sync_queue", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether any entry still targets this record.
    pub fn has_pending_for(&self, table: Table, record_id: &RecordId) -> StorageResult<bool> {
        let conn = self.store.lock_conn();
        has_pending(&conn, table, &record_id.to_string())
    }

    /// Whether any entry, in any table, still targets this record.
    pub fn has_pending_for_any(&self, record_id: &RecordId) -> StorageResult<bool> {
        let conn = self.store.lock_conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE record_id = ?",
            params![record_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Points every pending entry that targets or references `old` at `new`.
    /// Returns the number of rewritten entries.
    pub fn rewrite_references(&self, old: &RecordId, new: &RecordId) -> StorageResult<usize> {
        let (old, new) = (old.to_string(), new.to_string());
        let mut conn = self.store.lock_conn();
        let tx = conn.transaction()?;
        let rewritten = rewrite_refs(&tx, &old, &new)?;
        tx.commit()?;

        debug!(%old, %new, rewritten, "rewrote queued references");
        Ok(rewritten)
    }
}

pub(crate) fn remove_entry(conn: &Connection, id: &str) -> StorageResult<()> {
    conn.execute("DELETE FROM sync_queue WHERE id = ?", params![id])?;
    Ok(())
}

pub(crate) fn has_pending(conn: &Connection, table: Table, key: &str) -> StorageResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sync_queue WHERE table_name = ? AND record_id = ?",
        params![table.as_str(), key],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Points every entry that targets or references `old` at `new`.
pub(crate) fn rewrite_refs(conn: &Connection, old: &str, new: &str) -> StorageResult<usize> {
    let rows = {
        let mut stmt = conn.prepare(
            "SELECT id, record_id, data_json FROM sync_queue
             WHERE record_id = ?1 OR data_json LIKE ?2",
        )?;
        stmt.query_map(params![old, format!("%{old}%")], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?
    };

    let mut rewritten = 0;
    for (id, record_id, json) in rows {
        let Ok(mut payload) = serde_json::from_str::<Value>(&json) else {
            continue;
        };
        let payload_changed = replace_id_refs(&mut payload, old, new);
        let target_changed = record_id == old;
        if !payload_changed && !target_changed {
            continue;
        }
        let record_id = if target_changed { new.to_string() } else { record_id };
        conn.execute(
            "UPDATE sync_queue SET record_id = ?, data_json = ? WHERE id = ?",
            params![record_id, serde_json::to_string(&payload)?, id],
        )?;
        rewritten += 1;
    }
    Ok(rewritten)
}

pub(crate) fn insert_entry(
    conn: &Connection,
    table: Table,
    action: MutationAction,
    record_id: &RecordId,
    payload: &Value,
) -> StorageResult<String> {
    let id = Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO sync_queue (id, table_name, action, record_id, data_json, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            id,
            table.as_str(),
            action.as_str(),
            record_id.to_string(),
            serde_json::to_string(payload)?,
            now_millis(),
        ],
    )?;
    debug!(queue_id = %id, %table, %action, %record_id, "queued mutation");
    Ok(id)
}

fn decode_entry(
    id: String,
    table: &str,
    action: &str,
    record_id: &str,
    json: &str,
    created_at: i64,
) -> QueueEntry {
    let table = match table.parse::<Table>() {
        Ok(t) => t,
        Err(e) => return QueueEntry::Malformed { id, reason: e.to_string() },
    };
    let action = match action.parse::<MutationAction>() {
        Ok(a) => a,
        Err(reason) => return QueueEntry::Malformed { id, reason },
    };
    let payload = match serde_json::from_str::<Value>(json) {
        Ok(v) => v,
        Err(e) => {
            return QueueEntry::Malformed {
                id,
                reason: format!("unreadable payload: {e}"),
            };
        }
    };
    QueueEntry::Ready(QueuedMutation {
        id,
        table,
        action,
        record_id: RecordId::parse(record_id),
        payload,
        created_at: from_millis(created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn insert_raw(store: &LocalStore, id: &str, table: &str, action: &str, json: &str) {
        let conn = store.lock_conn();
        conn.execute(
            "INSERT INTO sync_queue (id, table_name, action, record_id, data_json, created_at)
             VALUES (?, ?, ?, 'r-1', ?, 0)",
            params![id, table, action, json],
        )
        .unwrap();
    }

    #[test]
    fn malformed_rows_are_reported_in_snapshot() {
        let store = LocalStore::open_in_memory().unwrap();
        let queue = store.queue();
        queue
            .add_to_sync_queue(Table::Deals, MutationAction::Create, &RecordId::remote("a"), &json!({"id": "a"}))
            .unwrap();
        insert_raw(&store, "bad-table", "masalih", "create", "{}");
        insert_raw(&store, "bad-action", "deals", "upsert", "{}");
        insert_raw(&store, "bad-json", "deals", "update", "{not json");

        let snapshot = queue.snapshot().unwrap();
        assert_eq!(snapshot.len(), 4);
        assert!(matches!(snapshot[0], QueueEntry::Ready(_)));
        let malformed: Vec<_> = snapshot
            .iter()
            .filter_map(|e| match e {
                QueueEntry::Malformed { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(malformed, vec!["bad-table", "bad-action", "bad-json"]);
    }

    #[test]
    fn get_sync_queue_skips_malformed_rows() {
        let store = LocalStore::open_in_memory().unwrap();
        let queue = store.queue();
        insert_raw(&store, "bad", "deals", "explode", "{}");
        queue
            .add_to_sync_queue(Table::Debts, MutationAction::Delete, &RecordId::remote("x"), &json!({"id": "x"}))
            .unwrap();

        let entries = queue.get_sync_queue().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].table, Table::Debts);
        assert_eq!(queue.len().unwrap(), 2);
    }
}
