//! Connectivity monitor.
//!
//! The platform layer feeds online/offline signals in through
//! [`ConnectivityMonitor::set_online`]; everything else reads the last known
//! value synchronously or subscribes to transitions.
//!
//! When the platform cannot report connectivity at all, the monitor starts
//! online. Direct writes are then attempted and a failed request falls back
//! to the local queue, instead of queueing everything up front.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Snapshot of the connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityState {
    pub online: bool,
    /// When the monitor last moved to online.
    pub last_online_at: Option<DateTime<Utc>>,
}

/// Shared, cloneable connectivity state.
#[derive(Clone, Debug)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<ConnectivityState>>,
}

impl ConnectivityMonitor {
    /// Creates a monitor from the platform's initial report. `None` means the
    /// platform cannot tell, which is treated as online.
    pub fn new(platform_status: Option<bool>) -> Self {
        let online = platform_status.unwrap_or(true);
        let (tx, _rx) = watch::channel(ConnectivityState {
            online,
            last_online_at: online.then(Utc::now),
        });
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn is_online(&self) -> bool {
        self.state.borrow().online
    }

    pub fn last_online_at(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().last_online_at
    }

    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    /// Records a platform connectivity signal. Subscribers are notified only
    /// on an actual transition.
    pub fn set_online(&self, online: bool) {
        let changed = self.state.send_if_modified(|state| {
            if state.online == online {
                return false;
            }
            state.online = online;
            if online {
                state.last_online_at = Some(Utc::now());
            }
            true
        });
        if changed {
            if online {
                info!("connectivity restored");
            } else {
                warn!("connectivity lost, writes will be queued locally");
            }
        }
    }

    /// Receives every subsequent state transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(None)
    }
}
