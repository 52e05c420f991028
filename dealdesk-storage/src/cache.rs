//! Local cache: one JSON record per `(table, id)` with a synced flag.

use crate::error::{StorageError, StorageResult};
use crate::refs::{record_key, replace_id_refs};
use crate::schema::last_synced_key;
use crate::store::LocalStore;
use crate::{from_millis, now_millis};
use chrono::{DateTime, Utc};
use dealdesk_model::{RecordId, Table};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

/// A cached entity with its sync state.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRecord {
    pub id: RecordId,
    pub data: Value,
    /// False until the remote store has confirmed this record's last write.
    pub synced: bool,
    pub updated_at: DateTime<Utc>,
}

/// Per-table key-value cache of entity records.
#[derive(Clone)]
pub struct LocalCache {
    store: LocalStore,
}

impl LocalCache {
    pub(crate) fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Stores a remote snapshot of `table` as synced records and advances the
    /// table's last-synced watermark.
    ///
    /// Synced rows missing from the snapshot are dropped. Rows with
    /// `synced = false` are left untouched: a pending local write stays
    /// visible until the sync manager confirms it.
    pub fn cache_data(&self, table: Table, items: &[Value]) -> StorageResult<usize> {
        let mut conn = self.store.lock_conn();
        let tx = conn.transaction()?;

        let pending = unsynced_ids(&tx, table)?;
        let mut keys = HashSet::with_capacity(items.len());
        let mut written = 0;
        let now = now_millis();

        for item in items {
            let key = match record_key(item) {
                Ok(key) => key,
                Err(e) => {
                    warn!(%table, "skipping remote row without id: {e}");
                    continue;
                }
            };
            keys.insert(key.clone());
            if pending.contains(&key) {
                debug!(%table, id = %key, "keeping unsynced local row over remote snapshot");
                continue;
            }
            put_row(&tx, table, &key, item, true, now)?;
            written += 1;
        }

        let stale: Vec<String> = synced_ids(&tx, table)?
            .into_iter()
            .filter(|id| !keys.contains(id))
            .collect();
        for id in &stale {
            delete_row(&tx, table, id)?;
        }

        tx.execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?, ?)",
            params![last_synced_key(table.as_str()), now.to_string()],
        )?;
        tx.commit()?;

        debug!(%table, written, dropped = stale.len(), "cached remote snapshot");
        Ok(written)
    }

    /// Returns the data of every cached record in `table`, synced or not.
    pub fn get_cached_data(&self, table: Table) -> StorageResult<Vec<Value>> {
        Ok(self.records(table)?.into_iter().map(|r| r.data).collect())
    }

    /// Returns every cached record of `table`, newest write first.
    pub fn records(&self, table: Table) -> StorageResult<Vec<CachedRecord>> {
        let conn = self.store.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT id, data_json, synced, updated_at FROM cache_records
             WHERE table_name = ? ORDER BY updated_at DESC, id",
        )?;
        let rows = stmt
            .query_map(params![table.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, json, synced, updated_at)| {
                match serde_json::from_str(&json) {
                    Ok(data) => Some(CachedRecord {
                        id: RecordId::parse(&id),
                        data,
                        synced,
                        updated_at: from_millis(updated_at),
                    }),
                    Err(e) => {
                        warn!(%table, %id, "skipping unreadable cache row: {e}");
                        None
                    }
                }
            })
            .collect())
    }

    /// Looks up one cached record by key.
    pub fn record(&self, table: Table, id: &RecordId) -> StorageResult<Option<CachedRecord>> {
        let conn = self.store.lock_conn();
        let row = conn
            .query_row(
                "SELECT data_json, synced, updated_at FROM cache_records
                 WHERE table_name = ? AND id = ?",
                params![table.as_str(), id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, bool>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(json, synced, updated_at)| {
            Ok(CachedRecord {
                id: id.clone(),
                data: serde_json::from_str(&json)?,
                synced,
                updated_at: from_millis(updated_at),
            })
        })
        .transpose()
    }

    /// Upserts one record with an explicit sync flag.
    pub fn update_local_cache(
        &self,
        table: Table,
        id: &RecordId,
        data: &Value,
        synced: bool,
    ) -> StorageResult<()> {
        let conn = self.store.lock_conn();
        put_row(&conn, table, &id.to_string(), data, synced, now_millis())
    }

    /// Merges `patch` over the cached record (absent fields keep their cached
    /// values) and returns the merged data.
    pub fn merge_local(
        &self,
        table: Table,
        id: &RecordId,
        patch: &Map<String, Value>,
        synced: bool,
    ) -> StorageResult<Value> {
        let mut conn = self.store.lock_conn();
        let tx = conn.transaction()?;
        let merged = merge_row(&tx, table, id, patch, synced)?;
        tx.commit()?;
        Ok(merged)
    }

    /// Removes a record. Removing a missing record is not an error.
    pub fn delete_from_local_cache(&self, table: Table, id: &RecordId) -> StorageResult<()> {
        let conn = self.store.lock_conn();
        delete_row(&conn, table, &id.to_string())
    }

    /// When `table` last received a full remote snapshot.
    pub fn last_synced_at(&self, table: Table) -> StorageResult<Option<DateTime<Utc>>> {
        let conn = self.store.lock_conn();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?",
                params![last_synced_key(table.as_str())],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.and_then(|v| v.parse::<i64>().ok()).map(from_millis))
    }

    /// Number of records in `table` whose last write is unconfirmed.
    pub fn unsynced_count(&self, table: Table) -> StorageResult<usize> {
        let conn = self.store.lock_conn();
        Ok(unsynced_ids(&conn, table)?.len())
    }

    /// Moves a record from a local id to its canonical id and rewrites every
    /// cached reference to the old id (e.g. `deal_id` on calls and tasks).
    ///
    /// `data` is the record to store under the new key with `synced`; `None`
    /// leaves no row behind (the record was deleted locally meanwhile).
    pub fn reconcile_id(
        &self,
        table: Table,
        old: &RecordId,
        new: &RecordId,
        data: Option<&Value>,
        synced: bool,
    ) -> StorageResult<usize> {
        let (old, new) = (old.to_string(), new.to_string());
        let mut conn = self.store.lock_conn();
        let tx = conn.transaction()?;
        let rewritten = rekey_row(&tx, table, &old, &new, data, synced)?;
        tx.commit()?;

        debug!(%table, %old, %new, rewritten, "reconciled local id");
        Ok(rewritten)
    }
}

/// Moves the row `old` to `new` (or drops it when `data` is `None`) and
/// rewrites references to `old` in every cached row.
pub(crate) fn rekey_row(
    conn: &Connection,
    table: Table,
    old: &str,
    new: &str,
    data: Option<&Value>,
    synced: bool,
) -> StorageResult<usize> {
    delete_row(conn, table, old)?;
    if let Some(data) = data {
        let mut data = data.clone();
        replace_id_refs(&mut data, old, new);
        put_row(conn, table, new, &data, synced, now_millis())?;
    }

    let rows = {
        let mut stmt = conn
            .prepare("SELECT table_name, id, data_json FROM cache_records WHERE data_json LIKE ?")?;
        stmt.query_map(params![format!("%{old}%")], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?
    };

    let mut rewritten = 0;
    for (table_name, id, json) in rows {
        let Ok(mut value) = serde_json::from_str::<Value>(&json) else {
            continue;
        };
        if replace_id_refs(&mut value, old, new) {
            conn.execute(
                "UPDATE cache_records SET data_json = ? WHERE table_name = ? AND id = ?",
                params![serde_json::to_string(&value)?, table_name, id],
            )?;
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

pub(crate) fn read_row(conn: &Connection, table: Table, id: &str) -> StorageResult<Option<Value>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT data_json FROM cache_records WHERE table_name = ? AND id = ?",
            params![table.as_str(), id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(json
        .map(|j| serde_json::from_str::<Value>(&j))
        .transpose()?)
}

pub(crate) fn put_row(
    conn: &Connection,
    table: Table,
    id: &str,
    data: &Value,
    synced: bool,
    updated_at: i64,
) -> StorageResult<()> {
    if !data.is_object() {
        return Err(StorageError::NotAnObject);
    }
    conn.execute(
        "INSERT OR REPLACE INTO cache_records (table_name, id, data_json, synced, updated_at)
         VALUES (?, ?, ?, ?, ?)",
        params![table.as_str(), id, serde_json::to_string(data)?, synced, updated_at],
    )?;
    Ok(())
}

pub(crate) fn merge_row(
    conn: &Connection,
    table: Table,
    id: &RecordId,
    patch: &Map<String, Value>,
    synced: bool,
) -> StorageResult<Value> {
    let key = id.to_string();
    let mut merged = match read_row(conn, table, &key)? {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    for (field, value) in patch {
        merged.insert(field.clone(), value.clone());
    }
    merged.insert("id".into(), Value::String(key.clone()));

    let merged = Value::Object(merged);
    put_row(conn, table, &key, &merged, synced, now_millis())?;
    Ok(merged)
}

pub(crate) fn delete_row(conn: &Connection, table: Table, id: &str) -> StorageResult<()> {
    conn.execute(
        "DELETE FROM cache_records WHERE table_name = ? AND id = ?",
        params![table.as_str(), id],
    )?;
    Ok(())
}

fn unsynced_ids(conn: &Connection, table: Table) -> StorageResult<HashSet<String>> {
    ids_with_flag(conn, table, false)
}

fn synced_ids(conn: &Connection, table: Table) -> StorageResult<HashSet<String>> {
    ids_with_flag(conn, table, true)
}

fn ids_with_flag(conn: &Connection, table: Table, synced: bool) -> StorageResult<HashSet<String>> {
    let mut stmt =
        conn.prepare("SELECT id FROM cache_records WHERE table_name = ? AND synced = ?")?;
    let ids = stmt
        .query_map(params![table.as_str(), synced], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(ids)
}
