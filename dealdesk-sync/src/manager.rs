//! Sync manager: replays the mutation queue against the remote gateway.
//!
//! A pass reads one queue snapshot and walks it strictly in insertion order.
//! Each entry is removed only after the gateway confirms it, in the same
//! local transaction that settles the cache; failed entries stay queued for
//! the next pass. Only one pass runs at a time.

use crate::connectivity::ConnectivityMonitor;
use crate::error::{SyncError, SyncResult};
use crate::gateway::{GatewayError, RemoteGateway, canonical_id, remote_payload};
use dealdesk_model::{RecordId, Table};
use dealdesk_storage::{
    LocalCache, LocalStore, MutationAction, MutationQueue, QueueEntry, QueuedMutation,
};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, broadcast, watch};
use tracing::{debug, info, warn};

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries confirmed by the remote store and removed from the queue.
    pub succeeded: usize,
    /// Entries left queued for the next pass.
    pub failed: usize,
    /// Malformed entries that can never be replayed.
    pub skipped: usize,
    /// Local ids replaced by canonical ids during the pass.
    pub reconciled: Vec<(RecordId, RecordId)>,
    /// Tables whose cached data changed.
    pub tables: BTreeSet<Table>,
}

impl SyncReport {
    /// Number of entries the pass looked at.
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    /// Short summary for a status line, e.g. "synced 3 changes".
    pub fn message(&self) -> String {
        match (self.succeeded, self.failed) {
            (0, 0) => "nothing to sync".to_string(),
            (ok, 0) => format!("synced {ok} {}", changes(ok)),
            (0, failed) => format!("{failed} {} failed", changes(failed)),
            (ok, failed) => format!("synced {ok} {}, {failed} failed", changes(ok)),
        }
    }
}

fn changes(n: usize) -> &'static str {
    if n == 1 { "change" } else { "changes" }
}

/// Progress notifications for observers such as a status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Started { pending: usize },
    Completed(SyncReport),
}

/// Drains the mutation queue and keeps the pending-count indicator current.
pub struct SyncManager {
    store: LocalStore,
    gateway: Arc<dyn RemoteGateway>,
    connectivity: ConnectivityMonitor,
    running: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
    pending: watch::Sender<usize>,
    drain_requests: Notify,
}

/// Clears the single-flight flag when a pass ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// What happened to one queue entry.
enum EntryOutcome {
    Applied,
    Failed,
}

impl SyncManager {
    pub fn new(
        store: LocalStore,
        gateway: Arc<dyn RemoteGateway>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        let initial = store.queue().len().unwrap_or_else(|e| {
            warn!("[SYNC] could not count pending mutations: {e}");
            0
        });
        let (events, _) = broadcast::channel(64);
        let (pending, _) = watch::channel(initial);
        Self {
            store,
            gateway,
            connectivity,
            running: AtomicBool::new(false),
            events,
            pending,
            drain_requests: Notify::new(),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn cache(&self) -> LocalCache {
        self.store.cache()
    }

    pub fn queue(&self) -> MutationQueue {
        self.store.queue()
    }

    pub fn gateway(&self) -> &Arc<dyn RemoteGateway> {
        &self.gateway
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// Subscribes to pass start/completion notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Last known number of queued mutations.
    pub fn pending_count(&self) -> usize {
        *self.pending.borrow()
    }

    pub fn watch_pending(&self) -> watch::Receiver<usize> {
        self.pending.subscribe()
    }

    /// Recounts the queue and publishes the result.
    pub fn refresh_pending(&self) -> SyncResult<usize> {
        let count = self.store.queue().len()?;
        self.pending.send_replace(count);
        Ok(count)
    }

    /// Asks the sync service for a pass soon. Never blocks; requests made
    /// before the service gets to them collapse into one pass.
    pub fn request_drain(&self) {
        self.drain_requests.notify_one();
    }

    /// Resolves once [`request_drain`](Self::request_drain) has been called.
    pub async fn drain_requested(&self) {
        self.drain_requests.notified().await;
    }

    pub fn is_syncing(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs one drain pass over the current queue snapshot.
    ///
    /// Fails fast with [`SyncError::Offline`] or [`SyncError::AlreadyRunning`]
    /// without touching the queue. Per-entry failures never abort the pass;
    /// they are counted in the report.
    pub async fn sync_now(&self) -> SyncResult<SyncReport> {
        if !self.connectivity.is_online() {
            return Err(SyncError::Offline);
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("[SYNC] drain already in progress, skipping trigger");
            return Err(SyncError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        let snapshot = self.store.queue().snapshot()?;
        if snapshot.is_empty() {
            self.refresh_pending()?;
            return Ok(SyncReport::default());
        }

        let _ = self.events.send(SyncEvent::Started {
            pending: snapshot.len(),
        });
        info!("[SYNC] draining {} queued mutations", snapshot.len());

        let mut report = SyncReport::default();
        // Records whose earlier entry failed in this pass; later entries that
        // target or reference them wait for the next pass.
        let mut blocked: HashSet<RecordId> = HashSet::new();
        let mut renamed: HashMap<RecordId, RecordId> = HashMap::new();

        for entry in snapshot {
            let mutation = match entry {
                QueueEntry::Ready(m) => apply_renames(m, &renamed),
                QueueEntry::Malformed { id, reason } => {
                    warn!("[SYNC] skipping malformed queue entry {id}: {reason}");
                    report.skipped += 1;
                    continue;
                }
            };

            let depends_on_failed = blocked.contains(&mutation.record_id)
                || mutation.references().iter().any(|r| blocked.contains(r));
            if depends_on_failed {
                debug!(
                    "[SYNC] deferring {} {} {}: depends on a failed entry",
                    mutation.action, mutation.table, mutation.record_id
                );
                blocked.insert(mutation.record_id.clone());
                report.failed += 1;
                continue;
            }

            match self.replay(&mutation, &mut report, &mut renamed).await {
                Ok(EntryOutcome::Applied) => {
                    report.succeeded += 1;
                    report.tables.insert(mutation.table);
                }
                Ok(EntryOutcome::Failed) => {
                    blocked.insert(mutation.record_id.clone());
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(
                        "[SYNC] local store error while replaying {}: {e}",
                        mutation.id
                    );
                    blocked.insert(mutation.record_id.clone());
                    report.failed += 1;
                }
            }
        }

        let remaining = self.refresh_pending()?;
        info!(
            "[SYNC] pass complete: {} ({} still queued)",
            report.message(),
            remaining
        );
        let _ = self.events.send(SyncEvent::Completed(report.clone()));
        Ok(report)
    }

    async fn replay(
        &self,
        mutation: &QueuedMutation,
        report: &mut SyncReport,
        renamed: &mut HashMap<RecordId, RecordId>,
    ) -> SyncResult<EntryOutcome> {
        let table = mutation.table;
        let id = &mutation.record_id;

        let remote = match mutation.action {
            MutationAction::Create => {
                self.gateway
                    .insert(table, &remote_payload(id, &mutation.payload))
                    .await
            }
            MutationAction::Update => self.gateway.update(table, id, &mutation.payload).await,
            MutationAction::Delete => match self.gateway.delete(table, id).await {
                Ok(()) | Err(GatewayError::NotFound(_)) => Ok(Value::Null),
                Err(e) => Err(e),
            },
        };
        let remote = match remote {
            Ok(value) => value,
            Err(e) => {
                warn!("[SYNC] {} {} {} failed: {e}", mutation.action, table, id);
                return Ok(EntryOutcome::Failed);
            }
        };

        let canonical = match mutation.action {
            // A store that answers without an id keeps the client key.
            MutationAction::Create => canonical_id(&remote).unwrap_or_else(|| confirmed_id(id)),
            MutationAction::Update | MutationAction::Delete => id.clone(),
        };
        self.store.confirm_replayed(mutation, &canonical, &remote)?;
        if canonical != *id {
            renamed.insert(id.clone(), canonical.clone());
            report.reconciled.push((id.clone(), canonical));
        }

        debug!("[SYNC] applied {} {} {}", mutation.action, table, id);
        Ok(EntryOutcome::Applied)
    }
}

/// The id a created record keeps when the store does not name one.
fn confirmed_id(id: &RecordId) -> RecordId {
    if id.is_local() {
        RecordId::remote(id.client_key())
    } else {
        id.clone()
    }
}

/// Points an entry read before a reconciliation in this pass at the
/// canonical ids. The stored copy was already rewritten.
fn apply_renames(
    mut mutation: QueuedMutation,
    renamed: &HashMap<RecordId, RecordId>,
) -> QueuedMutation {
    if renamed.is_empty() {
        return mutation;
    }
    if let Some(new) = renamed.get(&mutation.record_id) {
        mutation.record_id = new.clone();
    }
    if let Some(map) = mutation.payload.as_object_mut() {
        for (key, field) in map.iter_mut() {
            if key != "id" && !key.ends_with("_id") {
                continue;
            }
            let Some(old) = field.as_str().map(RecordId::parse) else {
                continue;
            };
            if let Some(new) = renamed.get(&old) {
                *field = Value::String(new.to_string());
            }
        }
    }
    mutation
}
