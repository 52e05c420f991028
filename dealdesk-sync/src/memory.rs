//! In-memory remote store.
//!
//! Behaves like the hosted store for the operations the gateway contract
//! names: client-supplied ids are kept, repeated inserts are idempotent and
//! rows come back newest first. Faults can be injected per record or for the
//! whole store, which makes it the gateway of choice for tests and demos.

use crate::gateway::{GatewayError, GatewayResult, RemoteGateway};
use async_trait::async_trait;
use chrono::Utc;
use dealdesk_model::{RecordId, Table};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// A call received by the store, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Select(Table),
    SelectById(Table, String),
    Insert(Table, Value),
    Update(Table, String, Value),
    Delete(Table, String),
}

#[derive(Default)]
struct State {
    rows: HashMap<Table, Vec<Value>>,
    calls: Vec<GatewayCall>,
    failing: HashMap<String, GatewayError>,
}

/// Remote store kept in process memory.
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<State>,
    unreachable: AtomicBool,
    server_ids: AtomicBool,
    next_id: AtomicUsize,
    hold: Mutex<Option<Arc<Notify>>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `srv-N` ids on insert instead of keeping client ids.
    pub fn with_server_ids(self) -> Self {
        self.server_ids.store(true, Ordering::Relaxed);
        self
    }

    /// Seeds a table with existing rows.
    pub fn with_rows(self, table: Table, rows: Vec<Value>) -> Self {
        self.lock().rows.insert(table, rows);
        self
    }

    /// Makes every call fail as unreachable.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::Relaxed);
    }

    /// Makes every call that targets `id` fail with `error`.
    pub fn fail_record(&self, id: impl Into<String>, error: GatewayError) {
        self.lock().failing.insert(id.into(), error);
    }

    pub fn heal_record(&self, id: &str) {
        self.lock().failing.remove(id);
    }

    /// Parks write calls until the returned gate is notified.
    pub fn hold_writes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.hold.lock().unwrap_or_else(|p| p.into_inner()) = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.lock().rows.get(&table).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn check(&self, key: Option<&str>) -> GatewayResult<()> {
        if self.unreachable.load(Ordering::Relaxed) {
            return Err(GatewayError::Unreachable("connection refused".into()));
        }
        match key.and_then(|k| self.lock().failing.get(k).cloned()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn wait_for_gate(&self) {
        let gate = self.hold.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

fn row_key(row: &Value) -> Option<String> {
    match row.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl RemoteGateway for MemoryGateway {
    async fn select(&self, table: Table) -> GatewayResult<Vec<Value>> {
        self.check(None)?;
        let mut state = self.lock();
        state.calls.push(GatewayCall::Select(table));
        Ok(state
            .rows
            .get(&table)
            .map(|rows| rows.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn select_by_id(&self, table: Table, id: &RecordId) -> GatewayResult<Option<Value>> {
        let key = id.to_string();
        self.check(Some(&key))?;
        let mut state = self.lock();
        state.calls.push(GatewayCall::SelectById(table, key.clone()));
        Ok(state
            .rows
            .get(&table)
            .and_then(|rows| rows.iter().find(|r| row_key(r).as_deref() == Some(&key)))
            .cloned())
    }

    async fn insert(&self, table: Table, record: &Value) -> GatewayResult<Value> {
        let client_key = row_key(record);
        self.check(client_key.as_deref())?;
        self.wait_for_gate().await;

        let Value::Object(fields) = record else {
            return Err(GatewayError::Rejected {
                status: Some(400),
                message: "record must be an object".into(),
            });
        };

        let mut state = self.lock();
        state.calls.push(GatewayCall::Insert(table, record.clone()));
        let rows = state.rows.entry(table).or_default();

        if let Some(key) = &client_key {
            let stored_as = |r: &&Value| {
                row_key(r).as_deref() == Some(key.as_str())
                    || r.get("client_key").and_then(Value::as_str) == Some(key.as_str())
            };
            if let Some(existing) = rows.iter().find(stored_as) {
                return Ok(existing.clone());
            }
        }

        let mut row: Map<String, Value> = fields.clone();
        if self.server_ids.load(Ordering::Relaxed) || client_key.is_none() {
            let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(key) = client_key {
                row.insert("client_key".into(), Value::String(key));
            }
            row.insert("id".into(), Value::String(format!("srv-{n}")));
        }
        row.entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        let row = Value::Object(row);
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, id: &RecordId, patch: &Value) -> GatewayResult<Value> {
        let key = id.to_string();
        self.check(Some(&key))?;
        self.wait_for_gate().await;

        let mut state = self.lock();
        state
            .calls
            .push(GatewayCall::Update(table, key.clone(), patch.clone()));
        let row = state
            .rows
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|r| row_key(r).as_deref() == Some(&key)))
            .ok_or_else(|| GatewayError::NotFound(key.clone()))?;

        if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
            for (field, value) in fields {
                if field != "id" {
                    target.insert(field.clone(), value.clone());
                }
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: Table, id: &RecordId) -> GatewayResult<()> {
        let key = id.to_string();
        self.check(Some(&key))?;
        self.wait_for_gate().await;

        let mut state = self.lock();
        state.calls.push(GatewayCall::Delete(table, key.clone()));
        let rows = state.rows.entry(table).or_default();
        let before = rows.len();
        rows.retain(|r| row_key(r).as_deref() != Some(&key));
        if rows.len() == before {
            return Err(GatewayError::NotFound(key));
        }
        Ok(())
    }
}
