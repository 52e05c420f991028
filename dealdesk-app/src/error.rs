use dealdesk_cloud::CloudError;
use dealdesk_data::DataError;
use dealdesk_priority::PriorityError;
use dealdesk_storage::StorageError;
use dealdesk_sync::SyncError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot write TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("remote store error: {0}")]
    Cloud(#[from] CloudError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("currency error: {0}")]
    Currency(#[from] PriorityError),
}

pub type AppResult<T> = Result<T, AppError>;
