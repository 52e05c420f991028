//! Background sync service.
//!
//! Owns a [`SyncManager`] on a tokio task and runs a drain pass whenever the
//! connectivity monitor reports a transition to online, when a caller asks
//! for one through the [`SyncHandle`] or [`SyncManager::request_drain`], and
//! on a retry timer while writes stay queued.

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityState;
use crate::error::{SyncError, SyncResult};
use crate::manager::{SyncManager, SyncReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Commands accepted by the sync service.
#[derive(Debug)]
pub enum SyncCommand {
    /// Run a drain pass now and report its outcome.
    SyncNow {
        reply: oneshot::Sender<SyncResult<SyncReport>>,
    },
    /// Stop the service.
    Shutdown,
}

/// Handle for sending commands to the sync service.
#[derive(Clone)]
pub struct SyncHandle {
    command_tx: mpsc::Sender<SyncCommand>,
}

impl SyncHandle {
    /// Forces a drain pass ("sync now") and waits for its report.
    pub async fn force_sync(&self) -> SyncResult<SyncReport> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(SyncCommand::SyncNow { reply })
            .await
            .map_err(|_| SyncError::ServiceStopped)?;
        rx.await.map_err(|_| SyncError::ServiceStopped)?
    }

    /// Stops the service. The current pass, if any, runs to completion first.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.command_tx
            .send(SyncCommand::Shutdown)
            .await
            .map_err(|_| SyncError::ServiceStopped)
    }
}

/// Spawns the sync service on the current tokio runtime.
pub fn spawn_sync_service(
    manager: Arc<SyncManager>,
    config: SyncConfig,
) -> (SyncHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
    // Subscribe before spawning so no transition is missed in between.
    let mut connectivity = manager.connectivity().subscribe();
    let was_online = connectivity.borrow_and_update().online;
    let task = tokio::spawn(run(manager, config, command_rx, connectivity, was_online));
    (SyncHandle { command_tx }, task)
}

async fn run(
    manager: Arc<SyncManager>,
    config: SyncConfig,
    mut command_rx: mpsc::Receiver<SyncCommand>,
    mut connectivity: watch::Receiver<ConnectivityState>,
    mut was_online: bool,
) {
    info!("[SYNC] service started (online: {was_online})");
    if config.sync_on_start && was_online {
        drain(&manager, "start-up").await;
    }

    let retry_enabled = config.retry_interval_secs > 0;
    let period = Duration::from_secs(config.retry_interval_secs.max(1));
    let mut retry = interval_at(Instant::now() + period, period);
    retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            cmd = command_rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("[SYNC] all handles dropped");
                    break;
                };
                match cmd {
                    SyncCommand::SyncNow { reply } => {
                        let result = manager.sync_now().await;
                        if let Err(e) = &result {
                            debug!("[SYNC] manual sync not run: {e}");
                        }
                        let _ = reply.send(result);
                    }
                    SyncCommand::Shutdown => {
                        info!("[SYNC] service shutting down");
                        break;
                    }
                }
            }
            changed = connectivity.changed() => {
                if changed.is_err() {
                    debug!("[SYNC] connectivity monitor dropped");
                    break;
                }
                let online = connectivity.borrow_and_update().online;
                let reconnected = online && !was_online;
                was_online = online;
                if reconnected && config.auto_sync_on_reconnect {
                    drain(&manager, "reconnect").await;
                }
            }
            () = manager.drain_requested() => {
                drain(&manager, "requested").await;
            }
            _ = retry.tick(), if retry_enabled => {
                if !manager.connectivity().is_online() {
                    continue;
                }
                match manager.refresh_pending() {
                    Ok(0) => {}
                    Ok(_) => drain(&manager, "retry").await,
                    Err(e) => warn!("[SYNC] could not count pending mutations: {e}"),
                }
            }
        }
    }
}

async fn drain(manager: &SyncManager, trigger: &str) {
    match manager.sync_now().await {
        Ok(report) if report.processed() > 0 => {
            info!("[SYNC] {trigger} sync: {}", report.message());
        }
        Ok(_) => {}
        Err(SyncError::AlreadyRunning) | Err(SyncError::Offline) => {}
        Err(e) => warn!("[SYNC] {trigger} sync failed: {e}"),
    }
}
