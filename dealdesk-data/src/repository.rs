//! Per-entity repository.
//!
//! Reads go to the remote store when online and write through to the local
//! cache; any remote failure falls back to the cache. Writes go to the remote
//! store when online. When offline, or when the store cannot be reached, they
//! are applied to the cache and queued for the sync manager. A refusal by the
//! store is returned to the caller and never queued.
//!
//! A record with unconfirmed local changes (a local id, an unsynced cache row
//! or queued entries) is always written through the queue, so its writes
//! reach the remote store in the order they were made. So is a write whose
//! `*_id` fields point at such a record: the drain sends the parent first and
//! rewrites the reference to its canonical id. Writes queued while online ask
//! the sync service for a pass right away.

use crate::change::{ChangeKind, DataChange};
use crate::error::{DataError, DataResult};
use chrono::Utc;
use dealdesk_model::{Record, RecordId, Table};
use dealdesk_storage::{CacheEffect, MutationAction, StagedWrite, payload_references};
use dealdesk_sync::{GatewayError, SyncManager, canonical_id, remote_payload};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Whether a write reached the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Confirmed by the remote store.
    Synced,
    /// Applied locally and queued; it will sync on reconnect.
    SavedLocally,
}

/// A written record and where it ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome<T> {
    pub record: T,
    pub status: WriteStatus,
}

impl<T> WriteOutcome<T> {
    fn synced(record: T) -> Self {
        Self {
            record,
            status: WriteStatus::Synced,
        }
    }

    fn saved_locally(record: T) -> Self {
        Self {
            record,
            status: WriteStatus::SavedLocally,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.status == WriteStatus::Synced
    }
}

pub(crate) struct Shared {
    pub(crate) sync: Arc<SyncManager>,
    pub(crate) changes: broadcast::Sender<DataChange>,
}

/// Typed access to one table.
pub struct Repository<T> {
    shared: Arc<Shared>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Repository<T> {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            _record: PhantomData,
        }
    }

    pub fn table(&self) -> Table {
        T::TABLE
    }

    fn sync(&self) -> &SyncManager {
        &self.shared.sync
    }

    fn online(&self) -> bool {
        self.sync().connectivity().is_online()
    }

    fn notify(&self, change: DataChange) {
        let _ = self.shared.changes.send(change);
    }

    /// Every record of the table.
    ///
    /// Records with unconfirmed local changes come first, in their local
    /// form; the remote rows follow in the store's order (newest first).
    pub async fn list(&self) -> DataResult<Vec<T>> {
        let table = T::TABLE;
        if self.online() {
            match self.sync().gateway().select(table).await {
                Ok(rows) => return self.write_through(rows),
                Err(e) => warn!(%table, "remote read failed, serving cached data: {e}"),
            }
        }
        Ok(decode_all(table, self.sync().cache().get_cached_data(table)?))
    }

    fn write_through(&self, rows: Vec<Value>) -> DataResult<Vec<T>> {
        let table = T::TABLE;
        let cache = self.sync().cache();

        let local: Vec<_> = cache
            .records(table)?
            .into_iter()
            .filter(|r| !r.synced)
            .collect();
        let mut shadowed: HashSet<RecordId> = local.iter().map(|r| r.id.clone()).collect();
        shadowed.extend(
            self.sync()
                .queue()
                .get_sync_queue()?
                .into_iter()
                .filter(|m| m.table == table)
                .map(|m| m.record_id),
        );

        let rows: Vec<Value> = rows
            .into_iter()
            .filter(|row| canonical_id(row).is_none_or(|id| !shadowed.contains(&id)))
            .collect();
        let written = cache.cache_data(table, &rows)?;
        debug!(%table, written, local = local.len(), "refreshed cache from remote");

        let mut out = decode_all(table, local.into_iter().map(|r| r.data));
        out.extend(decode_all(table, rows));
        Ok(out)
    }

    /// One record by id, or `None` if it does not exist.
    pub async fn get(&self, id: &RecordId) -> DataResult<Option<T>> {
        let table = T::TABLE;
        let cache = self.sync().cache();
        if self.online() && !self.has_local_changes(id)? {
            match self.sync().gateway().select_by_id(table, id).await {
                Ok(Some(row)) => {
                    cache.update_local_cache(table, id, &row, true)?;
                    return Ok(Some(serde_json::from_value(row)?));
                }
                Ok(None) => {
                    cache.delete_from_local_cache(table, id)?;
                    return Ok(None);
                }
                Err(e) => warn!(%table, %id, "remote read failed, serving cached record: {e}"),
            }
        }
        match cache.record(table, id)? {
            Some(cached) => Ok(Some(serde_json::from_value(cached.data)?)),
            None => Ok(None),
        }
    }

    /// Stores a new record. Its id is always client-generated so a retried
    /// create cannot duplicate it remotely.
    pub async fn create(&self, mut record: T) -> DataResult<WriteOutcome<T>> {
        let table = T::TABLE;
        if !record.id().is_local() {
            record.set_id(RecordId::new_local());
        }
        record.on_create(Utc::now());
        let id = record.id().clone();
        let value = serde_json::to_value(&record)?;
        if let Value::Object(fields) = &value {
            T::check_fields(fields).map_err(DataError::Invalid)?;
        }

        if self.online() && !self.references_unsynced(&value)? {
            let sent = remote_payload(&id, &value);
            match self.sync().gateway().insert(table, &sent).await {
                Ok(row) => {
                    let canonical =
                        canonical_id(&row).unwrap_or_else(|| RecordId::remote(id.client_key()));
                    self.sync()
                        .cache()
                        .update_local_cache(table, &canonical, &row, true)?;
                    let stored: T = serde_json::from_value(row)?;
                    self.notify(DataChange::record(table, canonical, ChangeKind::Created));
                    return Ok(WriteOutcome::synced(stored));
                }
                Err(e) if e.is_connectivity() => {
                    warn!(%table, "remote store unreachable, saving new record locally: {e}");
                }
                Err(e) => return Err(DataError::Rejected(e)),
            }
        }

        let staged = self.sync().store().stage_offline_write(
            table,
            MutationAction::Create,
            &id,
            CacheEffect::Put(value.clone()),
            &value,
        )?;
        self.queued(&staged, table, id, ChangeKind::Created);
        Ok(WriteOutcome::saved_locally(record))
    }

    /// Applies a partial update. `patch` must serialize to a JSON object;
    /// fields it omits keep their current values.
    pub async fn update(
        &self,
        id: &RecordId,
        patch: impl Serialize,
    ) -> DataResult<WriteOutcome<T>> {
        let table = T::TABLE;
        let mut fields = match serde_json::to_value(patch)? {
            Value::Object(fields) => fields,
            other => return Err(DataError::InvalidPatch(other.to_string())),
        };
        fields.remove("id");
        T::check_fields(&fields).map_err(DataError::Invalid)?;
        if T::TRACKS_UPDATES {
            fields.insert("updated_at".into(), Value::String(Utc::now().to_rfc3339()));
        }
        let patch = Value::Object(fields.clone());

        if self.online() && !self.has_local_changes(id)? && !self.references_unsynced(&patch)? {
            match self.sync().gateway().update(table, id, &patch).await {
                Ok(row) => {
                    self.sync()
                        .cache()
                        .update_local_cache(table, id, &row, true)?;
                    let stored: T = serde_json::from_value(row)?;
                    self.notify(DataChange::record(table, id.clone(), ChangeKind::Updated));
                    return Ok(WriteOutcome::synced(stored));
                }
                Err(e) if e.is_connectivity() => {
                    warn!(%table, %id, "remote store unreachable, saving update locally: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }

        if self.sync().cache().record(table, id)?.is_none() {
            return Err(DataError::NotFound(id.to_string()));
        }
        let staged = self.sync().store().stage_offline_write(
            table,
            MutationAction::Update,
            id,
            CacheEffect::Merge(fields),
            &patch,
        )?;
        let merged = staged
            .record
            .clone()
            .ok_or_else(|| DataError::NotFound(id.to_string()))?;
        let record: T = serde_json::from_value(merged)?;
        self.queued(&staged, table, id.clone(), ChangeKind::Updated);
        Ok(WriteOutcome::saved_locally(record))
    }

    /// Deletes a record. The cached copy is removed right away whichever
    /// path the delete takes.
    pub async fn delete(&self, id: &RecordId) -> DataResult<WriteStatus> {
        let table = T::TABLE;
        if self.online() && !self.has_local_changes(id)? {
            match self.sync().gateway().delete(table, id).await {
                Ok(()) | Err(GatewayError::NotFound(_)) => {
                    self.sync().cache().delete_from_local_cache(table, id)?;
                    self.notify(DataChange::record(table, id.clone(), ChangeKind::Deleted));
                    return Ok(WriteStatus::Synced);
                }
                Err(e) if e.is_connectivity() => {
                    warn!(%table, %id, "remote store unreachable, queueing delete: {e}");
                }
                Err(e) => return Err(DataError::Rejected(e)),
            }
        }

        let staged = self.sync().store().stage_offline_write(
            table,
            MutationAction::Delete,
            id,
            CacheEffect::Remove,
            &json!({ "id": id.to_string() }),
        )?;
        self.queued(&staged, table, id.clone(), ChangeKind::Deleted);
        Ok(WriteStatus::SavedLocally)
    }

    /// Records of this table attached to `deal`.
    pub async fn for_deal(&self, deal: &RecordId) -> DataResult<Vec<T>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.deal_id() == Some(deal))
            .collect())
    }

    pub(crate) async fn require(&self, id: &RecordId) -> DataResult<T> {
        self.get(id)
            .await?
            .ok_or_else(|| DataError::NotFound(id.to_string()))
    }

    fn has_local_changes(&self, id: &RecordId) -> DataResult<bool> {
        if id.is_local() {
            return Ok(true);
        }
        let table = T::TABLE;
        if self.sync().queue().has_pending_for(table, id)? {
            return Ok(true);
        }
        Ok(self
            .sync()
            .cache()
            .record(table, id)?
            .is_some_and(|r| !r.synced))
    }

    /// Whether `value` points at a record the remote store has not
    /// confirmed yet.
    fn references_unsynced(&self, value: &Value) -> DataResult<bool> {
        let table = T::TABLE;
        let queue = self.sync().queue();
        for referenced in payload_references(value) {
            if referenced.is_local() || queue.has_pending_for_any(&referenced)? {
                debug!(%table, %referenced, "write depends on an unsynced record");
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn queued(&self, staged: &StagedWrite, table: Table, id: RecordId, kind: ChangeKind) {
        debug!(%table, %id, queue_id = %staged.queue_id, "write saved locally");
        if let Err(e) = self.sync().refresh_pending() {
            warn!("could not refresh pending count: {e}");
        }
        if self.online() {
            self.sync().request_drain();
        }
        self.notify(DataChange::record(table, id, kind));
    }
}

fn decode_all<T: Record>(table: Table, rows: impl IntoIterator<Item = Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(%table, "skipping undecodable record: {e}");
                None
            }
        })
        .collect()
}

/// Builds a one-field patch.
pub(crate) fn field(name: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(name.to_string(), value);
    map
}
