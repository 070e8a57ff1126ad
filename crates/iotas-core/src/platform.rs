// ── Platform facade ──
//
// Owns one authenticated session, the accessory registry and the
// characteristic bridge. The host calls `restore()` with whatever it
// persisted, then `discover()` (or `run()` for periodic rediscovery), and
// routes characteristic requests through `read()` / `write()`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use iotas_api::{IotasClient, Room, TransportConfig};

use crate::bridge::{CharacteristicBridge, DebounceTiming};
use crate::config::PlatformConfig;
use crate::error::CoreError;
use crate::model::{Accessory, Binding, Characteristic, CharacteristicValue, SyncReport};
use crate::session::{IotasApi, Session, TokenManager, TopologyCache};
use crate::store::AccessoryStore;
use crate::sync::AccessorySynchronizer;

struct PlatformInner {
    config: PlatformConfig,
    topology: TopologyCache,
    synchronizer: AccessorySynchronizer,
    bridge: CharacteristicBridge,
}

/// Cheaply cloneable handle to one bridged account.
#[derive(Clone)]
pub struct Platform {
    inner: Arc<PlatformInner>,
}

impl Platform {
    /// Assemble a platform around any [`IotasApi`] implementation.
    pub fn new(
        config: PlatformConfig,
        api: Arc<dyn IotasApi>,
        store: Arc<dyn AccessoryStore>,
    ) -> Self {
        let tokens = TokenManager::new(
            Arc::clone(&api),
            config.username.clone(),
            config.password.clone(),
            config.auth_retry_delay,
        );
        let topology = TopologyCache::new(Session::new(api, tokens), config.unit.clone());
        let bridge = CharacteristicBridge::new(
            topology.clone(),
            Arc::clone(&store),
            DebounceTiming::default(),
        );
        Self {
            inner: Arc::new(PlatformInner {
                synchronizer: AccessorySynchronizer::new(store),
                topology,
                bridge,
                config,
            }),
        }
    }

    /// Build the HTTP client from `config` and assemble the platform.
    pub fn connect(config: PlatformConfig, store: Arc<dyn AccessoryStore>) -> Result<Self, CoreError> {
        let transport = TransportConfig::default().with_timeout(config.timeout);
        let client = IotasClient::new(config.base_url.clone(), &transport)?;
        Ok(Self::new(config, Arc::new(client), store))
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.inner.config
    }

    pub fn topology(&self) -> &TopologyCache {
        &self.inner.topology
    }

    /// Re-attach every accessory the store persisted. Must run before the
    /// first characteristic request is served.
    pub fn restore(&self) -> Result<usize, CoreError> {
        let cached = self.inner.synchronizer.store().cached()?;
        let count = cached.len();
        for accessory in cached {
            info!(name = %accessory.display_name, "loading accessory from cache");
            self.inner.synchronizer.restore(accessory);
        }
        Ok(count)
    }

    /// Fetch the room graph and reconcile accessories against it.
    pub async fn discover(&self) -> Result<SyncReport, CoreError> {
        let rooms = self.inner.topology.unit_rooms().await?;
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.synchronizer.sync(&rooms))
            .await
            .map_err(|e| CoreError::Store {
                message: format!("accessory sync did not complete: {e}"),
            })?
    }

    /// Fresh room graph of the active unit.
    pub async fn rooms(&self) -> Result<Arc<Vec<Room>>, CoreError> {
        self.inner.topology.unit_rooms().await
    }

    pub fn accessories(&self) -> Vec<Accessory> {
        self.inner.synchronizer.accessories()
    }

    pub fn resolve(&self, identifier: &str) -> Result<Accessory, CoreError> {
        self.inner.synchronizer.resolve(identifier)
    }

    pub fn bindings(&self, accessory: Uuid) -> Vec<Binding> {
        self.inner.synchronizer.bindings(accessory)
    }

    pub async fn read(
        &self,
        accessory: Uuid,
        characteristic: Characteristic,
    ) -> Result<CharacteristicValue, CoreError> {
        let binding = self.inner.synchronizer.binding(accessory, characteristic)?;
        self.inner.bridge.read(accessory, &binding).await
    }

    pub async fn write(
        &self,
        accessory: Uuid,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> Result<(), CoreError> {
        let binding = self.inner.synchronizer.binding(accessory, characteristic)?;
        self.inner.bridge.write(accessory, &binding, value).await
    }

    /// Restore, discover, then rediscover every `refresh_interval` until
    /// `cancel` fires. A failed pass is logged and retried on the next tick.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), CoreError> {
        self.restore()?;
        self.discover_logged().await;

        let period = self.inner.config.refresh_interval;
        if period.is_zero() {
            cancel.cancelled().await;
            return Ok(());
        }

        let mut interval = tokio::time::interval(period);
        interval.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    debug!("rediscovery tick");
                    self.discover_logged().await;
                }
            }
        }
        Ok(())
    }

    async fn discover_logged(&self) {
        match self.discover().await {
            Ok(report) if !report.failed.is_empty() => {
                warn!(
                    failed = report.failed.len(),
                    "some accessories were not stored, retrying next pass"
                );
            }
            Ok(_) => {}
            Err(CoreError::NoUnit) => error!("no units found, nothing to bridge"),
            Err(e) => warn!(error = %e, "discovery failed"),
        }
    }
}
