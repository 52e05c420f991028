//! Sync error types.

use crate::gateway::GatewayError;
use dealdesk_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while replaying the mutation queue.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cannot sync while offline")]
    Offline,

    #[error("a sync pass is already running")]
    AlreadyRunning,

    #[error("sync service is not running")]
    ServiceStopped,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}
