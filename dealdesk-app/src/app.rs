//! Service wiring. Everything is built once, here, and shared from then on.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::telemetry::init_tracing;
use anyhow::Context;
use chrono::{Local, NaiveDate};
use dealdesk_cloud::RestGateway;
use dealdesk_data::DataAccess;
use dealdesk_priority::{PriorityEngine, PriorityReport, RateTable};
use dealdesk_storage::LocalStore;
use dealdesk_sync::{
    ConnectivityMonitor, DisconnectedGateway, RemoteGateway, SyncHandle, SyncManager,
    spawn_sync_service,
};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A running DealDesk core.
///
/// Must be created inside a Tokio runtime: opening spawns the sync service
/// and the change forwarder.
pub struct App {
    config: AppConfig,
    data: DataAccess,
    sync: SyncHandle,
    engine: PriorityEngine,
    sync_task: JoinHandle<()>,
    forwarder: JoinHandle<()>,
}

impl App {
    /// Reads the config file, installs logging and opens the app.
    pub fn from_config_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = AppConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?;
        init_tracing(&config.log_level);
        Self::open(config).context("starting DealDesk")
    }

    /// Opens the app with the gateway the config asks for. Without a
    /// `[remote]` section the app runs from the local cache only and stays
    /// offline.
    pub fn open(config: AppConfig) -> AppResult<Self> {
        let (gateway, connectivity) = match &config.remote {
            Some(remote) => {
                info!(url = %remote.base_url, "using remote store");
                let gateway: Arc<dyn RemoteGateway> = Arc::new(RestGateway::new(remote.clone())?);
                (gateway, ConnectivityMonitor::default())
            }
            None => {
                warn!("no remote store configured, working from the local cache only");
                let gateway: Arc<dyn RemoteGateway> = Arc::new(DisconnectedGateway);
                (gateway, ConnectivityMonitor::new(Some(false)))
            }
        };
        Self::with_gateway(config, gateway, connectivity)
    }

    /// Opens the app over an explicit gateway and connectivity monitor.
    pub fn with_gateway(
        config: AppConfig,
        gateway: Arc<dyn RemoteGateway>,
        connectivity: ConnectivityMonitor,
    ) -> AppResult<Self> {
        config.validate()?;
        let engine = PriorityEngine::new(RateTable::from_config(&config.currency)?);
        let store = LocalStore::open(Path::new(&config.database_path))?;

        let manager = Arc::new(SyncManager::new(store, gateway, connectivity));
        let data = DataAccess::new(manager.clone());
        // Forward before the service starts so a start-up drain is seen.
        let forwarder = data.forward_sync_events();
        let (sync, sync_task) = spawn_sync_service(manager, config.sync.clone());

        info!(
            database = %config.database_path,
            pending = data.pending_changes(),
            online = data.is_online(),
            "DealDesk ready"
        );
        Ok(Self {
            config,
            data,
            sync,
            engine,
            sync_task,
            forwarder,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn data(&self) -> &DataAccess {
        &self.data
    }

    pub fn sync(&self) -> &SyncHandle {
        &self.sync
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        self.data.sync().connectivity()
    }

    /// Platform hook for online/offline signals.
    pub fn set_online(&self, online: bool) {
        self.connectivity().set_online(online);
    }

    pub fn engine(&self) -> &PriorityEngine {
        &self.engine
    }

    /// Ranks the current deals for today (local calendar).
    pub async fn dashboard(&self) -> AppResult<PriorityReport> {
        self.dashboard_on(Local::now().date_naive()).await
    }

    /// Reads deals and debts fresh and ranks them as of `today`.
    pub async fn dashboard_on(&self, today: NaiveDate) -> AppResult<PriorityReport> {
        let deals = self.data.deals().list().await?;
        let debts = self.data.debts().list().await?;
        Ok(self.engine.report(&deals, &debts, today))
    }

    /// Stops the sync service, letting a running pass finish.
    pub async fn shutdown(self) -> AppResult<()> {
        self.sync.shutdown().await?;
        if let Err(e) = self.sync_task.await {
            warn!("sync service ended abnormally: {e}");
        }
        self.forwarder.abort();
        info!("DealDesk stopped");
        Ok(())
    }
}
