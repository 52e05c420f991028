//! Cloud gateway error types.

use dealdesk_sync::GatewayError;
use thiserror::Error;

/// Result type for cloud operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors raised while talking to the hosted store.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Statuses that mean the store is temporarily out of reach rather than
/// refusing the request.
fn is_transient(status: u16) -> bool {
    matches!(status, 408 | 502 | 503 | 504)
}

impl From<CloudError> for GatewayError {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::Http(e) if e.is_decode() => GatewayError::Decode(e.to_string()),
            CloudError::Http(e) => match e.status() {
                Some(status) if !is_transient(status.as_u16()) => GatewayError::Rejected {
                    status: Some(status.as_u16()),
                    message: e.to_string(),
                },
                _ => GatewayError::Unreachable(e.to_string()),
            },
            CloudError::Status { status: 404, message } => GatewayError::NotFound(message),
            CloudError::Status { status, message } if is_transient(status) => {
                GatewayError::Unreachable(format!("status {status}: {message}"))
            }
            CloudError::Status { status, message } => GatewayError::Rejected {
                status: Some(status),
                message,
            },
            CloudError::Serialization(e) => GatewayError::Decode(e.to_string()),
            CloudError::UnexpectedBody(message) => GatewayError::Decode(message),
            CloudError::Config(message) => GatewayError::Rejected {
                status: None,
                message,
            },
        }
    }
}
