use crate::cache::{LocalCache, delete_row, merge_row, put_row, read_row, rekey_row};
use crate::error::{StorageError, StorageResult};
use crate::now_millis;
use crate::queue::{
    MutationAction, MutationQueue, QueuedMutation, has_pending, insert_entry, remove_entry,
    rewrite_refs,
};
use crate::schema::initialize_schema;
use dealdesk_model::{RecordId, Table};
use rusqlite::Connection;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// What an offline write does to the cached copy of its record.
#[derive(Debug, Clone)]
pub enum CacheEffect {
    /// Store the full record.
    Put(Value),
    /// Merge these fields over the cached record.
    Merge(serde_json::Map<String, Value>),
    /// Drop the cached record.
    Remove,
}

/// Result of staging an offline write.
#[derive(Debug, Clone)]
pub struct StagedWrite {
    pub queue_id: String,
    /// The cached record after the write, `None` for removals.
    pub record: Option<Value>,
}

/// Thread-safe handle to the local database.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    /// Opens or creates the database at `path`. `:memory:` opens an
    /// in-memory database.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if path.as_os_str() == ":memory:" {
            return Self::open_in_memory();
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        initialize_schema(&conn)?;
        info!(path = %path.display(), "local store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn cache(&self) -> LocalCache {
        LocalCache::new(self.clone())
    }

    pub fn queue(&self) -> MutationQueue {
        MutationQueue::new(self.clone())
    }

    /// Applies an offline write to the cache and appends it to the queue in
    /// one transaction, so neither can exist without the other.
    ///
    /// Cache rows touched here are marked unsynced.
    pub fn stage_offline_write(
        &self,
        table: Table,
        action: MutationAction,
        record_id: &RecordId,
        effect: CacheEffect,
        payload: &Value,
    ) -> StorageResult<StagedWrite> {
        let key = record_id.to_string();
        let mut conn = self.lock_conn();
        let tx = conn.transaction()?;

        let record = match effect {
            CacheEffect::Put(data) => {
                if !data.is_object() {
                    return Err(StorageError::NotAnObject);
                }
                put_row(&tx, table, &key, &data, false, now_millis())?;
                Some(data)
            }
            CacheEffect::Merge(patch) => Some(merge_row(&tx, table, record_id, &patch, false)?),
            CacheEffect::Remove => {
                delete_row(&tx, table, &key)?;
                None
            }
        };
        let queue_id = insert_entry(&tx, table, action, record_id, payload)?;
        tx.commit()?;

        Ok(StagedWrite { queue_id, record })
    }

    /// Settles a queue entry the remote store has applied, in one
    /// transaction: the entry leaves the queue and the cache takes the
    /// store's answer.
    ///
    /// `canonical` is the id the store keeps for the record. When it differs
    /// from the entry's target, queued entries and cached rows that target or
    /// reference the old id move to it. A record with later queued writes
    /// keeps its local copy, unsynced. When `remote` is not a JSON object the
    /// local copy is kept and marked synced.
    pub fn confirm_replayed(
        &self,
        mutation: &QueuedMutation,
        canonical: &RecordId,
        remote: &Value,
    ) -> StorageResult<()> {
        let table = mutation.table;
        let key = mutation.record_id.to_string();
        let remote = remote.is_object().then_some(remote);
        let mut conn = self.lock_conn();
        let tx = conn.transaction()?;

        remove_entry(&tx, &mutation.id)?;
        if *canonical != mutation.record_id {
            let new = canonical.to_string();
            rewrite_refs(&tx, &key, &new)?;
            let pending = has_pending(&tx, table, &new)?;
            // A local delete since the create leaves nothing to store.
            let local = read_row(&tx, table, &key)?;
            let data = local
                .as_ref()
                .map(|local| if pending { local } else { remote.unwrap_or(local) });
            rekey_row(&tx, table, &key, &new, data, !pending)?;
            debug!(%table, old = %key, %new, pending, "settled create under canonical id");
        } else if mutation.action != MutationAction::Delete && !has_pending(&tx, table, &key)? {
            let data = match remote {
                Some(remote) => Some(remote.clone()),
                None => read_row(&tx, table, &key)?,
            };
            if let Some(data) = data {
                put_row(&tx, table, &key, &data, true, now_millis())?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Acquire the connection lock, recovering from poison if a previous
    /// holder panicked.
    pub(crate) fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("recovering from poisoned local store mutex");
            poisoned.into_inner()
        })
    }
}
