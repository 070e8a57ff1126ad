//! Headless bridge: restore the accessory cache, discover, then keep
//! rediscovering until Ctrl+C.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use iotas_core::{AccessoryStore, Platform};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::store::JsonFileStore;

use super::ActiveProfile;

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let active = ActiveProfile::resolve(global)?;
    let mut config = active.platform_config()?;
    if let Some(secs) = args.refresh_interval {
        config.refresh_interval = Duration::from_secs(secs);
    }

    let store = JsonFileStore::open(active.cache_path(args.cache))?;
    info!(
        profile = %active.name,
        cache = %store.path().display(),
        refresh_secs = config.refresh_interval.as_secs(),
        "starting bridge"
    );
    let store: Arc<dyn AccessoryStore> = Arc::new(store);
    let platform = Platform::connect(config, store)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("interrupted, shutting down"),
                Err(e) => warn!(error = %e, "cannot listen for Ctrl+C, stopping"),
            }
            cancel.cancel();
        }
    });

    platform.run(cancel).await?;
    info!(accessories = platform.accessories().len(), "bridge stopped");
    Ok(())
}
