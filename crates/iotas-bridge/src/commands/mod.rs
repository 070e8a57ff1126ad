//! Command dispatch: bridges CLI args -> platform calls -> output formatting.

pub mod characteristic;
pub mod config_cmd;
pub mod devices;
pub mod run;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use iotas_config::{Config, ConfigError, Defaults, Profile};
use iotas_core::{AccessoryStore, MemoryStore, Platform, PlatformConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an account-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(args, global).await,
        Command::Sync(args) => sync::handle(args, global).await,
        Command::Devices(args) => devices::handle(args, global).await,
        Command::Read(args) => characteristic::read(args, global).await,
        Command::Write(args) => characteristic::write(args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

/// Config file honoured by every command: `--config` or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(iotas_config::config_path)
}

pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(iotas_config::load_config_from(&config_file(global))?)
}

/// The active profile, taken out of the loaded config.
pub struct ActiveProfile {
    pub name: String,
    pub profile: Profile,
    pub defaults: Defaults,
}

impl ActiveProfile {
    pub fn resolve(global: &GlobalOpts) -> Result<Self, CliError> {
        let mut cfg = load_config(global)?;
        let name = match cfg.profile(global.profile.as_deref()) {
            Ok((name, _)) => name,
            Err(ConfigError::UnknownProfile { profile }) => {
                return Err(CliError::ProfileNotFound {
                    name: profile,
                    path: config_file(global).display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let profile = cfg.profiles.remove(&name).unwrap_or_default();
        Ok(Self {
            name,
            profile,
            defaults: cfg.defaults,
        })
    }

    pub fn platform_config(&self) -> Result<PlatformConfig, CliError> {
        Ok(iotas_config::profile_to_platform_config(
            &self.profile,
            &self.name,
            &self.defaults,
        )?)
    }

    /// Accessory cache of `run` / `sync`, unless overridden on the command line.
    pub fn cache_path(&self, cli_override: Option<PathBuf>) -> PathBuf {
        cli_override
            .unwrap_or_else(|| iotas_config::accessory_cache_path(&self.profile, &self.name))
    }
}

/// Connect a platform for one-shot commands: in-memory store, one
/// discovery pass so accessories can be resolved by name.
pub async fn discovered_platform(global: &GlobalOpts) -> Result<Platform, CliError> {
    let active = ActiveProfile::resolve(global)?;
    let store: Arc<dyn AccessoryStore> = Arc::new(MemoryStore::new());
    let platform = Platform::connect(active.platform_config()?, store)?;
    platform.discover().await?;
    Ok(platform)
}
