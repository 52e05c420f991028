//! Data access error types.

use dealdesk_storage::StorageError;
use dealdesk_sync::GatewayError;
use thiserror::Error;

/// Result type for data access operations.
pub type DataResult<T> = Result<T, DataError>;

/// Errors surfaced to callers of the repositories.
///
/// Connectivity failures never appear here: they are absorbed by reading the
/// cache or queueing the write.
#[derive(Debug, Error)]
pub enum DataError {
    /// The remote store refused an online write. Nothing was queued.
    #[error("remote store rejected the change: {0}")]
    Rejected(GatewayError),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("update must be a JSON object of fields, got {0}")]
    InvalidPatch(String),

    /// The record or patch breaks an entity invariant. Nothing was written.
    #[error("invalid record: {0}")]
    Invalid(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("could not decode record: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<GatewayError> for DataError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(id) => DataError::NotFound(id),
            other => DataError::Rejected(other),
        }
    }
}
