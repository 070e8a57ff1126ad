// ── Core error types ──
//
// Errors surfaced by iotas-core. Transport-layer failures are flattened
// into `Remote` so callers never see reqwest types. The enum is `Clone`
// because single-flight results are shared between every waiter.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// No token could be obtained; a background retry is pending.
    #[error("No credential available -- authentication will be retried")]
    NotAuthenticated,

    #[error("No units found for this account")]
    NoUnit,

    // ── Remote errors ────────────────────────────────────────────────
    #[error("Remote API error: {message}")]
    Remote {
        message: String,
        /// HTTP status code (if the server answered).
        status: Option<u16>,
    },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Feature not found: {feature_id}")]
    FeatureNotFound { feature_id: u64 },

    #[error("Accessory not found: {identifier}")]
    AccessoryNotFound { identifier: String },

    #[error("Accessory {accessory} has no {characteristic} characteristic")]
    CharacteristicNotFound {
        accessory: String,
        characteristic: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("{characteristic} is read-only")]
    ReadOnly { characteristic: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Accessory store error: {message}")]
    Store { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if the server rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Remote { status: Some(401), .. })
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<iotas_api::Error> for CoreError {
    fn from(err: iotas_api::Error) -> Self {
        match err {
            iotas_api::Error::Authentication { message } => Self::Authentication { message },
            iotas_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            iotas_api::Error::Tls(message) => Self::Config { message },
            other => Self::Remote {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}
