use dealdesk_model::{RecordId, Table};
use dealdesk_storage::{CacheEffect, LocalStore, MutationAction};
use async_trait::async_trait;
use dealdesk_sync::{
    ConnectivityMonitor, GatewayCall, GatewayError, GatewayResult, MemoryGateway, RemoteGateway,
    SyncError, SyncEvent, SyncManager,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;

fn setup(gateway: MemoryGateway) -> (LocalStore, Arc<MemoryGateway>, Arc<SyncManager>) {
    let store = LocalStore::open_in_memory().unwrap();
    let gateway = Arc::new(gateway);
    let manager = Arc::new(SyncManager::new(
        store.clone(),
        gateway.clone(),
        ConnectivityMonitor::new(Some(true)),
    ));
    (store, gateway, manager)
}

fn stage_create(store: &LocalStore, table: Table, record: Value) -> RecordId {
    let id = RecordId::new_local();
    let mut record = record;
    record["id"] = json!(id.to_string());
    store
        .stage_offline_write(table, MutationAction::Create, &id, CacheEffect::Put(record.clone()), &record)
        .unwrap();
    id
}

fn stage_update(store: &LocalStore, table: Table, id: &RecordId, patch: Value) {
    let fields = patch.as_object().unwrap().clone();
    store
        .stage_offline_write(table, MutationAction::Update, id, CacheEffect::Merge(fields), &patch)
        .unwrap();
}

fn stage_delete(store: &LocalStore, table: Table, id: &RecordId) {
    store
        .stage_offline_write(
            table,
            MutationAction::Delete,
            id,
            CacheEffect::Remove,
            &json!({"id": id.to_string()}),
        )
        .unwrap();
}

fn inserts(gateway: &MemoryGateway) -> Vec<(Table, Value)> {
    gateway
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            GatewayCall::Insert(t, v) => Some((t, v)),
            _ => None,
        })
        .collect()
}

// ── Guards ───────────────────────────────────────────────────────

#[tokio::test]
async fn offline_sync_is_refused_and_queue_untouched() {
    let (store, gateway, manager) = setup(MemoryGateway::new());
    stage_create(&store, Table::Deals, json!({"name": "x"}));
    manager.connectivity().set_online(false);

    let err = manager.sync_now().await.unwrap_err();

    assert!(matches!(err, SyncError::Offline));
    assert_eq!(store.queue().len().unwrap(), 1);
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn empty_queue_reports_nothing() {
    let (_store, gateway, manager) = setup(MemoryGateway::new());
    let report = manager.sync_now().await.unwrap();
    assert_eq!(report.processed(), 0);
    assert_eq!(report.message(), "nothing to sync");
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn concurrent_trigger_is_skipped_while_draining() {
    let (store, gateway, manager) = setup(MemoryGateway::new());
    stage_create(&store, Table::Tasks, json!({"title": "t"}));
    let gate = gateway.hold_writes();

    let first = tokio::spawn({
        let manager = manager.clone();
        async move { manager.sync_now().await }
    });
    while !manager.is_syncing() {
        tokio::task::yield_now().await;
    }

    assert!(matches!(
        manager.sync_now().await,
        Err(SyncError::AlreadyRunning)
    ));

    gate.notify_one();
    let report = first.await.unwrap().unwrap();
    assert_eq!(report.succeeded, 1);
    assert!(!manager.is_syncing());
    assert_eq!(inserts(&gateway).len(), 1);
}

#[tokio::test]
async fn entry_queued_during_a_pass_waits_for_the_next_one() {
    let (store, gateway, manager) = setup(MemoryGateway::new());
    let first = stage_create(&store, Table::Deals, json!({"name": "first"}));
    let gate = gateway.hold_writes();

    let pass = tokio::spawn({
        let manager = manager.clone();
        async move { manager.sync_now().await }
    });
    while !manager.is_syncing() {
        tokio::task::yield_now().await;
    }
    let late = stage_create(&store, Table::Deals, json!({"name": "late"}));
    gate.notify_one();
    let report = pass.await.unwrap().unwrap();

    assert_eq!(report.processed(), 1);
    assert_eq!(report.reconciled[0].0, first);
    let left = store.queue().get_sync_queue().unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].record_id, late);
    assert_eq!(inserts(&gateway).len(), 1);

    let next = manager.sync_now().await.unwrap();
    assert_eq!(next.succeeded, 1);
    assert!(store.queue().is_empty().unwrap());
}

// ── Replay ───────────────────────────────────────────────────────

#[tokio::test]
async fn offline_debt_create_reaches_remote_and_cache_flips_to_synced() {
    let (store, gateway, manager) = setup(MemoryGateway::new());
    let local = stage_create(
        &store,
        Table::Debts,
        json!({"creditor_name": "Bank", "amount": 1000}),
    );

    let report = manager.sync_now().await.unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);
    let sent = inserts(&gateway);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Table::Debts);
    assert_eq!(sent[0].1["amount"], 1000);
    assert_eq!(sent[0].1["id"], local.client_key());

    let canonical = RecordId::remote(local.client_key());
    assert_eq!(report.reconciled, vec![(local.clone(), canonical.clone())]);
    let cached = store.cache().record(Table::Debts, &canonical).unwrap().unwrap();
    assert!(cached.synced);
    assert!(store.cache().record(Table::Debts, &local).unwrap().is_none());
    assert!(store.queue().is_empty().unwrap());
}

#[tokio::test]
async fn failed_middle_entry_stays_queued_and_others_succeed() {
    let (store, gateway, manager) = setup(MemoryGateway::new());
    stage_create(&store, Table::Deals, json!({"name": "first"}));
    let middle = stage_create(&store, Table::Debts, json!({"creditor_name": "flaky"}));
    stage_create(&store, Table::Tasks, json!({"title": "third"}));
    gateway.fail_record(
        middle.client_key(),
        GatewayError::Rejected {
            status: Some(500),
            message: "boom".into(),
        },
    );

    let report = manager.sync_now().await.unwrap();

    assert_eq!((report.succeeded, report.failed), (2, 1));
    assert_eq!(report.message(), "synced 2 changes, 1 failed");
    let left = store.queue().get_sync_queue().unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].record_id, middle);
    assert_eq!(manager.pending_count(), 1);
}

#[tokio::test]
async fn unreachable_store_leaves_everything_for_next_pass() {
    let (store, gateway, manager) = setup(MemoryGateway::new());
    stage_create(&store, Table::Deals, json!({"name": "a"}));
    stage_create(&store, Table::Deals, json!({"name": "b"}));
    gateway.set_unreachable(true);

    let report = manager.sync_now().await.unwrap();
    assert_eq!((report.succeeded, report.failed), (0, 2));
    assert_eq!(report.message(), "2 changes failed");
    assert_eq!(store.queue().len().unwrap(), 2);

    gateway.set_unreachable(false);
    let report = manager.sync_now().await.unwrap();
    assert_eq!((report.succeeded, report.failed), (2, 0));
    assert!(store.queue().is_empty().unwrap());
}

#[tokio::test]
async fn retried_create_is_not_duplicated_remotely() {
    let (store, gateway, manager) = setup(MemoryGateway::new());
    let local = stage_create(&store, Table::Calls, json!({"contact_name": "Omar"}));
    // The store applied the create but the confirmation never arrived.
    let mut sent = store.queue().get_sync_queue().unwrap()[0].payload.clone();
    sent["id"] = json!(local.client_key());
    dealdesk_sync::RemoteGateway::insert(gateway.as_ref(), Table::Calls, &sent)
        .await
        .unwrap();

    manager.sync_now().await.unwrap();

    assert_eq!(gateway.rows(Table::Calls).len(), 1);
    assert!(store.queue().is_empty().unwrap());
}

#[tokio::test]
async fn delete_of_record_missing_remotely_counts_as_success() {
    let (store, _gateway, manager) = setup(MemoryGateway::new());
    stage_delete(&store, Table::Tasks, &RecordId::remote("gone"));

    let report = manager.sync_now().await.unwrap();

    assert_eq!(report.succeeded, 1);
    assert!(store.queue().is_empty().unwrap());
}

#[tokio::test]
async fn rejected_update_is_kept_and_cache_stays_unsynced() {
    let gateway = MemoryGateway::new()
        .with_rows(Table::Deals, vec![json!({"id": "d1", "name": "server"})]);
    let (store, gateway, manager) = setup(gateway);
    let id = RecordId::remote("d1");
    store
        .cache()
        .update_local_cache(Table::Deals, &id, &json!({"id": "d1", "name": "server"}), true)
        .unwrap();
    stage_update(&store, Table::Deals, &id, json!({"name": "mine"}));
    gateway.fail_record(
        "d1",
        GatewayError::Rejected {
            status: Some(409),
            message: "conflict".into(),
        },
    );

    let report = manager.sync_now().await.unwrap();

    assert_eq!(report.failed, 1);
    let cached = store.cache().record(Table::Deals, &id).unwrap().unwrap();
    assert!(!cached.synced);
    assert_eq!(cached.data["name"], "mine");
}

// ── Ordering and reconciliation ──────────────────────────────────

#[tokio::test]
async fn child_waits_for_failed_parent_create() {
    let (store, gateway, manager) = setup(MemoryGateway::new());
    let deal = stage_create(&store, Table::Deals, json!({"name": "Warehouse"}));
    stage_create(
        &store,
        Table::Calls,
        json!({"contact_name": "Omar", "deal_id": deal.to_string()}),
    );
    gateway.fail_record(deal.client_key(), GatewayError::Unreachable("timeout".into()));

    let report = manager.sync_now().await.unwrap();

    assert_eq!((report.succeeded, report.failed), (0, 2));
    assert!(inserts(&gateway).iter().all(|(t, _)| *t == Table::Deals));
    assert_eq!(store.queue().len().unwrap(), 2);

    gateway.heal_record(&deal.client_key());
    let report = manager.sync_now().await.unwrap();

    assert_eq!((report.succeeded, report.failed), (2, 0));
    let sent = inserts(&gateway);
    let (table, call) = sent.last().unwrap();
    assert_eq!(*table, Table::Calls);
    assert_eq!(call["deal_id"], deal.client_key());
}

#[tokio::test]
async fn server_assigned_ids_flow_into_later_entries_and_cache() {
    let (store, gateway, manager) = setup(MemoryGateway::new().with_server_ids());
    let deal = stage_create(&store, Table::Deals, json!({"name": "Old name"}));
    stage_update(&store, Table::Deals, &deal, json!({"name": "New name"}));
    let task = stage_create(
        &store,
        Table::Tasks,
        json!({"title": "send offer", "deal_id": deal.to_string()}),
    );

    let report = manager.sync_now().await.unwrap();

    assert_eq!(report.succeeded, 3);
    let deal_id = RecordId::remote("srv-1");
    assert_eq!(report.reconciled[0], (deal.clone(), deal_id.clone()));
    assert!(gateway.calls().contains(&GatewayCall::Update(
        Table::Deals,
        "srv-1".into(),
        json!({"name": "New name"})
    )));

    let cached_deal = store.cache().record(Table::Deals, &deal_id).unwrap().unwrap();
    assert!(cached_deal.synced);
    assert_eq!(cached_deal.data["name"], "New name");

    let task_id = RecordId::remote("srv-2");
    assert!(store.cache().record(Table::Tasks, &task).unwrap().is_none());
    let cached_task = store.cache().record(Table::Tasks, &task_id).unwrap().unwrap();
    assert_eq!(cached_task.data["deal_id"], "srv-1");
}

#[tokio::test]
async fn create_then_delete_offline_leaves_no_cache_row() {
    let (store, gateway, manager) = setup(MemoryGateway::new());
    let id = stage_create(&store, Table::DailyMoves, json!({"title": "call bank"}));
    stage_delete(&store, Table::DailyMoves, &id);

    let report = manager.sync_now().await.unwrap();

    assert_eq!(report.succeeded, 2);
    assert!(store.cache().get_cached_data(Table::DailyMoves).unwrap().is_empty());
    assert!(gateway.rows(Table::DailyMoves).is_empty());
}

#[tokio::test]
async fn malformed_entry_is_skipped_without_blocking_others() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.db");
    let store = LocalStore::open(&path).unwrap();
    let gateway = Arc::new(MemoryGateway::new());
    let manager = SyncManager::new(
        store.clone(),
        gateway.clone(),
        ConnectivityMonitor::new(Some(true)),
    );

    rusqlite::Connection::open(&path)
        .unwrap()
        .execute(
            "INSERT INTO sync_queue (id, table_name, action, record_id, data_json, created_at)
             VALUES ('broken', 'invoices', 'create', 'x', '{}', 0)",
            [],
        )
        .unwrap();
    stage_create(&store, Table::Jobs, json!({"name": "Consulting"}));

    let report = manager.sync_now().await.unwrap();

    assert_eq!((report.succeeded, report.failed, report.skipped), (1, 0, 1));
    assert_eq!(store.queue().len().unwrap(), 1);
}

// ── Notifications ────────────────────────────────────────────────

#[tokio::test]
async fn pass_emits_started_and_completed_events() {
    let (store, _gateway, manager) = setup(MemoryGateway::new());
    let mut events = manager.subscribe();
    stage_create(&store, Table::Deals, json!({"name": "a"}));
    manager.refresh_pending().unwrap();
    assert_eq!(manager.pending_count(), 1);

    let report = manager.sync_now().await.unwrap();

    assert_eq!(events.recv().await.unwrap(), SyncEvent::Started { pending: 1 });
    assert_eq!(events.recv().await.unwrap(), SyncEvent::Completed(report.clone()));
    assert!(report.tables.contains(&Table::Deals));
    assert_eq!(manager.pending_count(), 0);
}

/// Accepts every write but answers without the stored row.
struct SilentGateway;

#[async_trait]
impl RemoteGateway for SilentGateway {
    async fn select(&self, _table: Table) -> GatewayResult<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn select_by_id(&self, _table: Table, _id: &RecordId) -> GatewayResult<Option<Value>> {
        Ok(None)
    }

    async fn insert(&self, _table: Table, _record: &Value) -> GatewayResult<Value> {
        Ok(Value::Null)
    }

    async fn update(&self, _table: Table, _id: &RecordId, _patch: &Value) -> GatewayResult<Value> {
        Ok(json!({}))
    }

    async fn delete(&self, _table: Table, _id: &RecordId) -> GatewayResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn create_confirmed_without_a_row_keeps_the_client_key() {
    let store = LocalStore::open_in_memory().unwrap();
    let manager = SyncManager::new(
        store.clone(),
        Arc::new(SilentGateway),
        ConnectivityMonitor::new(Some(true)),
    );
    let deal = stage_create(&store, Table::Deals, json!({"name": "quiet"}));
    let task = stage_create(
        &store,
        Table::Tasks,
        json!({"title": "t", "deal_id": deal.to_string()}),
    );

    let report = manager.sync_now().await.unwrap();

    assert_eq!(report.succeeded, 2);
    let canonical = RecordId::remote(deal.client_key());
    assert!(report.reconciled.contains(&(deal.clone(), canonical.clone())));
    let cache = store.cache();
    let cached = cache.record(Table::Deals, &canonical).unwrap().unwrap();
    assert!(cached.synced);
    assert_eq!(cached.data["name"], "quiet");
    assert!(cache.record(Table::Deals, &deal).unwrap().is_none());
    assert_eq!(cache.unsynced_count(Table::Deals).unwrap(), 0);
    assert_eq!(cache.unsynced_count(Table::Tasks).unwrap(), 0);
    let task = cache
        .record(Table::Tasks, &RecordId::remote(task.client_key()))
        .unwrap()
        .unwrap();
    assert_eq!(task.data["deal_id"], json!(deal.client_key()));
}
