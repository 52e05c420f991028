//! Sync service configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the background sync service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Drain the queue on every offline → online transition.
    pub auto_sync_on_reconnect: bool,

    /// Drain once at start-up if online, picking up writes left over from a
    /// previous session.
    pub sync_on_start: bool,

    /// Capacity of the command channel.
    pub command_buffer: usize,

    /// While online with writes still queued, retry a pass this often.
    /// `0` disables the retry timer.
    pub retry_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync_on_reconnect: true,
            sync_on_start: true,
            command_buffer: 32,
            retry_interval_secs: 30,
        }
    }
}
