use dealdesk_model::{RecordId, Table};
use dealdesk_storage::{LocalStore, MutationAction, MutationQueue};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashSet;

fn push(queue: &MutationQueue, table: Table, action: MutationAction, id: &str) -> String {
    let record_id = RecordId::parse(id);
    queue
        .add_to_sync_queue(table, action, &record_id, &json!({"id": id}))
        .unwrap()
}

#[test]
fn new_queue_is_empty() {
    let store = LocalStore::open_in_memory().unwrap();
    let queue = store.queue();
    assert!(queue.is_empty().unwrap());
    assert!(queue.get_sync_queue().unwrap().is_empty());
}

#[test]
fn entries_come_back_in_insertion_order() {
    let store = LocalStore::open_in_memory().unwrap();
    let queue = store.queue();
    let ids: Vec<_> = (0..20)
        .map(|i| push(&queue, Table::Deals, MutationAction::Update, &format!("d{i}")))
        .collect();

    let listed: Vec<_> = queue
        .get_sync_queue()
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(listed, ids);
}

#[test]
fn rapid_adds_get_distinct_ids() {
    let store = LocalStore::open_in_memory().unwrap();
    let queue = store.queue();
    let ids: HashSet<_> = (0..500)
        .map(|_| push(&queue, Table::Tasks, MutationAction::Create, "t"))
        .collect();
    assert_eq!(ids.len(), 500);
}

#[test]
fn removing_middle_entry_keeps_order() {
    let store = LocalStore::open_in_memory().unwrap();
    let queue = store.queue();
    let a = push(&queue, Table::Deals, MutationAction::Create, "a");
    let b = push(&queue, Table::Debts, MutationAction::Update, "b");
    let c = push(&queue, Table::Calls, MutationAction::Delete, "c");

    queue.remove_from_sync_queue(&b).unwrap();

    let listed: Vec<_> = queue
        .get_sync_queue()
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(listed, vec![a, c]);
}

#[test]
fn remove_missing_entry_is_ok() {
    let store = LocalStore::open_in_memory().unwrap();
    store.queue().remove_from_sync_queue("never-queued").unwrap();
}

#[test]
fn clear_empties_queue() {
    let store = LocalStore::open_in_memory().unwrap();
    let queue = store.queue();
    push(&queue, Table::Deals, MutationAction::Create, "a");
    push(&queue, Table::Deals, MutationAction::Create, "b");

    assert_eq!(queue.clear_sync_queue().unwrap(), 2);
    assert!(queue.is_empty().unwrap());
}

#[test]
fn entry_carries_table_action_and_payload() {
    let store = LocalStore::open_in_memory().unwrap();
    let queue = store.queue();
    let id = RecordId::new_local();
    queue
        .add_to_sync_queue(
            Table::DailyMoves,
            MutationAction::Create,
            &id,
            &json!({"id": id.to_string(), "title": "call supplier"}),
        )
        .unwrap();

    let entry = &queue.get_sync_queue().unwrap()[0];
    assert_eq!(entry.table, Table::DailyMoves);
    assert_eq!(entry.action, MutationAction::Create);
    assert_eq!(entry.record_id, id);
    assert_eq!(entry.payload["title"], "call supplier");
}

#[test]
fn pending_lookup_is_per_record() {
    let store = LocalStore::open_in_memory().unwrap();
    let queue = store.queue();
    push(&queue, Table::Deals, MutationAction::Update, "d1");

    assert!(queue.has_pending_for(Table::Deals, &RecordId::parse("d1")).unwrap());
    assert!(!queue.has_pending_for(Table::Deals, &RecordId::parse("d2")).unwrap());
    assert!(!queue.has_pending_for(Table::Debts, &RecordId::parse("d1")).unwrap());
}

#[test]
fn rewrite_references_updates_targets_and_payloads() {
    let store = LocalStore::open_in_memory().unwrap();
    let queue = store.queue();
    let local = RecordId::new_local();
    let remote = RecordId::remote("srv-9");

    queue
        .add_to_sync_queue(Table::Deals, MutationAction::Update, &local, &json!({"name": "x"}))
        .unwrap();
    queue
        .add_to_sync_queue(
            Table::Calls,
            MutationAction::Create,
            &RecordId::parse("c1"),
            &json!({"id": "c1", "deal_id": local.to_string()}),
        )
        .unwrap();
    push(&queue, Table::Debts, MutationAction::Delete, "unrelated");

    assert_eq!(queue.rewrite_references(&local, &remote).unwrap(), 2);

    let entries = queue.get_sync_queue().unwrap();
    assert_eq!(entries[0].record_id, remote);
    assert_eq!(entries[1].payload["deal_id"], "srv-9");
    assert_eq!(entries[1].references(), vec![remote.clone()]);
    assert_eq!(entries[2].record_id, RecordId::parse("unrelated"));
}

#[test]
fn queue_survives_reopen_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("local.db");
    let ids = {
        let store = LocalStore::open(&path).unwrap();
        let queue = store.queue();
        vec![
            push(&queue, Table::Deals, MutationAction::Create, "a"),
            push(&queue, Table::Deals, MutationAction::Update, "a"),
        ]
    };

    let store = LocalStore::open(&path).unwrap();
    let listed: Vec<_> = store
        .queue()
        .get_sync_queue()
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(listed, ids);
}
