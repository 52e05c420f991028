//! Offline synchronization for DealDesk.
//!
//! - [`ConnectivityMonitor`] holds the last known online/offline state
//! - [`RemoteGateway`] is the contract every remote store implements
//! - [`SyncManager`] drains the mutation queue against the gateway
//! - [`spawn_sync_service`] runs the manager on reconnect and on demand
//! - [`MemoryGateway`] is an in-process remote store for tests and demos
//!
//! All state lives in explicitly constructed values passed by handle; there
//! are no process-wide globals.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod gateway;
pub mod manager;
pub mod memory;
pub mod service;

pub use config::SyncConfig;
pub use connectivity::{ConnectivityMonitor, ConnectivityState};
pub use error::{SyncError, SyncResult};
pub use gateway::{
    DisconnectedGateway, GatewayError, GatewayResult, RemoteGateway, canonical_id, remote_payload,
};
pub use manager::{SyncEvent, SyncManager, SyncReport};
pub use memory::{GatewayCall, MemoryGateway};
pub use service::{SyncCommand, SyncHandle, spawn_sync_service};
