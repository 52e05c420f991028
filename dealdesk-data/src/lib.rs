//! Data access for DealDesk.
//!
//! [`DataAccess`] is built once from the [`SyncManager`] and hands out one
//! [`Repository`] per entity type. All repositories share the manager's
//! connectivity state, cache, queue and gateway, plus one change channel.

mod change;
mod entities;
mod error;
mod repository;

pub use change::{ChangeKind, DataChange};
pub use error::{DataError, DataResult};
pub use repository::{Repository, WriteOutcome, WriteStatus};

use dealdesk_model::{CalendarEvent, Call, DailyMove, Deal, DealFile, Debt, Job, Record, Task};
use dealdesk_sync::{SyncEvent, SyncManager};
use repository::Shared;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::debug;

const CHANGE_BUFFER: usize = 256;

/// Entry point to every repository.
#[derive(Clone)]
pub struct DataAccess {
    shared: Arc<Shared>,
}

impl DataAccess {
    pub fn new(sync: Arc<SyncManager>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            shared: Arc::new(Shared { sync, changes }),
        }
    }

    pub fn repository<T: Record>(&self) -> Repository<T> {
        Repository::new(self.shared.clone())
    }

    pub fn deals(&self) -> Repository<Deal> {
        self.repository()
    }

    pub fn debts(&self) -> Repository<Debt> {
        self.repository()
    }

    pub fn jobs(&self) -> Repository<Job> {
        self.repository()
    }

    pub fn calls(&self) -> Repository<Call> {
        self.repository()
    }

    pub fn tasks(&self) -> Repository<Task> {
        self.repository()
    }

    pub fn events(&self) -> Repository<CalendarEvent> {
        self.repository()
    }

    pub fn files(&self) -> Repository<DealFile> {
        self.repository()
    }

    pub fn daily_moves(&self) -> Repository<DailyMove> {
        self.repository()
    }

    pub fn sync(&self) -> &Arc<SyncManager> {
        &self.shared.sync
    }

    pub fn is_online(&self) -> bool {
        self.shared.sync.connectivity().is_online()
    }

    /// Writes saved locally and not yet confirmed remotely.
    pub fn pending_changes(&self) -> usize {
        self.shared.sync.pending_count()
    }

    /// Receives a notice for every write and every completed sync pass.
    pub fn subscribe(&self) -> broadcast::Receiver<DataChange> {
        self.shared.changes.subscribe()
    }

    /// Forwards completed sync passes as table-level change notices.
    pub fn forward_sync_events(&self) -> JoinHandle<()> {
        let mut events = self.shared.sync.subscribe();
        let changes = self.shared.changes.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SyncEvent::Completed(report)) => {
                        for table in report.tables {
                            let _ = changes.send(DataChange::table(table, ChangeKind::Synced));
                        }
                    }
                    Ok(SyncEvent::Started { .. }) => {}
                    Err(RecvError::Lagged(missed)) => {
                        debug!(missed, "sync event forwarder lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
