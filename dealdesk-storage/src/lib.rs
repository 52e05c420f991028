//! Local persistence for DealDesk.
//!
//! One SQLite database holds three stores:
//!
//! - `cache_records`: the local cache, one row per `(table, id)` with a
//!   synced flag and last-write timestamp
//! - `sync_queue`: the durable FIFO of mutations awaiting remote confirmation
//! - `sync_meta`: per-table watermarks and other small bookkeeping values
//!
//! Access goes through [`LocalStore`], which hands out [`LocalCache`] and
//! [`MutationQueue`] views over a shared connection. Every operation takes
//! the connection lock for its whole duration, and multi-step writes run in
//! a single transaction, so read-modify-write on a table is never torn.

mod cache;
mod error;
mod queue;
mod refs;
mod schema;
mod store;

pub use cache::{CachedRecord, LocalCache};
pub use error::{StorageError, StorageResult};
pub use queue::{MutationAction, MutationQueue, QueueEntry, QueuedMutation, payload_references};
pub use store::{CacheEffect, LocalStore, StagedWrite};

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
