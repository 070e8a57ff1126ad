// ── Runtime platform configuration ──
//
// Describes *how* to reach the IOTAS API and which unit to bridge. Carries
// credential data and tuning, but never touches disk: `iotas-config`
// builds a `PlatformConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Delay before a failed authentication is retried.
pub const DEFAULT_AUTH_RETRY_DELAY: Duration = Duration::from_secs(10 * 60);

/// Interval between rediscovery passes of a long-running bridge.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Configuration for one bridged account.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// API root (defaults to the production endpoint).
    pub base_url: Url,
    /// Account email, also sent with refresh grants.
    pub username: String,
    pub password: SecretString,
    /// Residency display name to bridge instead of the first one.
    pub unit: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// How long to wait before retrying a failed authentication.
    pub auth_retry_delay: Duration,
    /// Interval between rediscovery passes. `Duration::ZERO` = discover once.
    pub refresh_interval: Duration,
}

impl PlatformConfig {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            ..Self::default()
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(iotas_api::DEFAULT_BASE_URL).expect("default base URL is valid"),
            username: String::new(),
            password: SecretString::from(String::new()),
            unit: None,
            timeout: Duration::from_secs(30),
            auth_retry_delay: DEFAULT_AUTH_RETRY_DELAY,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}
