//! Remote data gateway contract.
//!
//! The gateway is the only component that talks to the network. Its errors
//! distinguish "could not reach the store" (recovered locally by queueing or
//! reading the cache) from "the store refused the request" (surfaced to the
//! user, never retried). Timeouts count as unreachable.

use async_trait::async_trait;
use dealdesk_model::{RecordId, Table};
use serde_json::Value;
use thiserror::Error;

/// Result type for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors returned by a remote gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("remote store unreachable: {0}")]
    Unreachable(String),

    #[error("remote store rejected the request (status {status:?}): {message}")]
    Rejected {
        status: Option<u16>,
        message: String,
    },

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// True for failures caused by connectivity rather than by the store.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, GatewayError::Unreachable(_))
    }
}

/// Per-table CRUD against the remote store.
///
/// `insert` must be safe to repeat: the record carries a client-supplied id,
/// and inserting the same id twice yields the same stored record. The sync
/// manager relies on this to retry creates whose confirmation was lost.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// All rows of a table, newest first.
    async fn select(&self, table: Table) -> GatewayResult<Vec<Value>>;

    async fn select_by_id(&self, table: Table, id: &RecordId) -> GatewayResult<Option<Value>>;

    /// Inserts a record and returns the canonical stored row.
    async fn insert(&self, table: Table, record: &Value) -> GatewayResult<Value>;

    /// Applies a partial update and returns the updated row.
    async fn update(&self, table: Table, id: &RecordId, patch: &Value) -> GatewayResult<Value>;

    async fn delete(&self, table: Table, id: &RecordId) -> GatewayResult<()>;
}

/// Gateway used when no remote store is configured. Every call fails as
/// unreachable, so reads come from the cache and writes are queued.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisconnectedGateway;

#[async_trait]
impl RemoteGateway for DisconnectedGateway {
    async fn select(&self, _table: Table) -> GatewayResult<Vec<Value>> {
        Err(not_configured())
    }

    async fn select_by_id(&self, _table: Table, _id: &RecordId) -> GatewayResult<Option<Value>> {
        Err(not_configured())
    }

    async fn insert(&self, _table: Table, _record: &Value) -> GatewayResult<Value> {
        Err(not_configured())
    }

    async fn update(&self, _table: Table, _id: &RecordId, _patch: &Value) -> GatewayResult<Value> {
        Err(not_configured())
    }

    async fn delete(&self, _table: Table, _id: &RecordId) -> GatewayResult<()> {
        Err(not_configured())
    }
}

fn not_configured() -> GatewayError {
    GatewayError::Unreachable("no remote store configured".into())
}

/// The record as sent to the remote store: a local id is replaced by its
/// client key so the store can keep it verbatim.
pub fn remote_payload(id: &RecordId, record: &Value) -> Value {
    let mut out = record.clone();
    if let (RecordId::Local(_), Some(map)) = (id, out.as_object_mut()) {
        map.insert("id".into(), Value::String(id.client_key()));
    }
    out
}

/// Reads the canonical id from a row returned by the remote store.
pub fn canonical_id(row: &Value) -> Option<RecordId> {
    row.get("id")
        .and_then(|v| serde_json::from_value::<RecordId>(v.clone()).ok())
}
