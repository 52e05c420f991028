//! DealDesk composition root.
//!
//! [`App`] reads an [`AppConfig`], opens the local store, picks the remote
//! gateway, starts the sync service and exposes the repositories and the
//! dashboard report. Presentation layers hold one `App` for their lifetime.

mod app;
mod config;
mod error;
mod telemetry;

pub use app::App;
pub use config::AppConfig;
pub use error::{AppError, AppResult, ConfigError};
pub use telemetry::init_tracing;
