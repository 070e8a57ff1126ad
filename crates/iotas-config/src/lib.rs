//! Configuration for the IOTAS bridge.
//!
//! TOML profiles (one per IOTAS account), credential resolution
//! (env + keyring + plaintext), and translation to
//! `iotas_core::PlatformConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use iotas_core::PlatformConfig;

const KEYRING_SERVICE: &str = "iotas-bridge";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is given on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named IOTAS accounts.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        self.profiles
            .get(&name)
            .map(|profile| (name.clone(), profile))
            .ok_or(ConfigError::UnknownProfile { profile: name })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between rediscovery passes of `run`; 0 discovers once.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Seconds to wait before retrying a failed login.
    #[serde(default = "default_auth_retry_delay")]
    pub auth_retry_delay: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            refresh_interval: default_refresh_interval(),
            auth_retry_delay: default_auth_retry_delay(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_refresh_interval() -> u64 {
    iotas_core::config::DEFAULT_REFRESH_INTERVAL.as_secs()
}
fn default_auth_retry_delay() -> u64 {
    iotas_core::config::DEFAULT_AUTH_RETRY_DELAY.as_secs()
}

/// One IOTAS account.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Account email.
    pub username: Option<String>,

    /// Password (plaintext, prefer keyring or `IOTAS_PASSWORD`).
    pub password: Option<String>,

    /// Residency display name to bridge instead of the first one.
    pub unit: Option<String>,

    /// API root override.
    pub base_url: Option<String>,

    /// Override the default timeout.
    pub timeout: Option<u64>,

    /// Override the default rediscovery interval.
    pub refresh_interval: Option<u64>,

    /// JSON file holding the accessory cache of `run`.
    pub accessory_cache: Option<PathBuf>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "iotas-bridge", "iotas-bridge")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("iotas-bridge");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default accessory cache for a profile.
pub fn accessory_cache_path(profile: &Profile, profile_name: &str) -> PathBuf {
    if let Some(path) = &profile.accessory_cache {
        return path.clone();
    }
    let file = format!("accessories-{profile_name}.json");
    project_dirs().map_or_else(
        || dirs_fallback().join(&file),
        |dirs| dirs.data_dir().join(&file),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from an explicit file, merged over defaults and under `IOTAS_` env.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("IOTAS_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

/// Resolve username + password: env var, then keyring, then plaintext.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<(String, SecretString), ConfigError> {
    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var("IOTAS_USERNAME").ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;

    // 1. Env var
    if let Ok(pw) = std::env::var("IOTAS_PASSWORD") {
        return Ok((username, SecretString::from(pw)));
    }

    // 2. Keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(pw) = entry.get_password() {
            return Ok((username, SecretString::from(pw)));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok((username, SecretString::from(pw.clone())));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

// ── Translation to the core config ──────────────────────────────────

/// Build a `PlatformConfig` from a profile, resolving its credentials.
pub fn profile_to_platform_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<PlatformConfig, ConfigError> {
    let (username, password) = resolve_credentials(profile, profile_name)?;
    build_platform_config(profile, defaults, username, password)
}

/// Build a `PlatformConfig` from a profile and already-resolved credentials.
pub fn build_platform_config(
    profile: &Profile,
    defaults: &Defaults,
    username: String,
    password: SecretString,
) -> Result<PlatformConfig, ConfigError> {
    let mut config = PlatformConfig::new(username, password);

    if let Some(ref raw) = profile.base_url {
        config.base_url = raw.parse().map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
    }

    config.unit = profile
        .unit
        .clone()
        .or_else(|| std::env::var("IOTAS_UNIT").ok());
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.refresh_interval =
        Duration::from_secs(profile.refresh_interval.unwrap_or(defaults.refresh_interval));
    config.auth_retry_delay = Duration::from_secs(defaults.auth_retry_delay);
    Ok(config)
}
