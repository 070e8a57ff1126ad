//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use iotas_config::ConfigError;
use iotas_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(iotas::auth_failed),
        help(
            "Verify the account email and password.\n\
             Run: iotas-bridge config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("Not signed in to IOTAS")]
    #[diagnostic(
        code(iotas::not_authenticated),
        help("The login was rejected or the service is unreachable. Re-run with -v for details.")
    )]
    NotAuthenticated,

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(iotas::no_credentials),
        help(
            "Configure credentials with: iotas-bridge config init\n\
             Or set IOTAS_USERNAME and IOTAS_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Remote ───────────────────────────────────────────────────────

    #[error("IOTAS request failed: {message}")]
    #[diagnostic(code(iotas::remote))]
    Remote { message: String },

    #[error("No units found for this account")]
    #[diagnostic(
        code(iotas::no_unit),
        help("The account has no residency. Check it in the IOTAS app.")
    )]
    NoUnit,

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(iotas::not_found),
        help("Run: iotas-bridge devices list")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(iotas::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(iotas::profile_not_found),
        help(
            "Create one with: iotas-bridge config init\n\
             Expected at: {path}"
        )
    )]
    ProfileNotFound { name: String, path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(iotas::config))]
    Config { message: String },

    #[error("Accessory cache error: {message}")]
    #[diagnostic(
        code(iotas::store),
        help("Delete the accessory cache file to rebuild it on the next run.")
    )]
    Store { message: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(iotas::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } | Self::NotAuthenticated | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } | Self::NoUnit => exit_code::NOT_FOUND,
            Self::Remote { .. } => exit_code::CONNECTION,
            Self::Validation { .. } | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Authentication { message } => CliError::AuthFailed { message },

            CoreError::NotAuthenticated => CliError::NotAuthenticated,

            CoreError::NoUnit => CliError::NoUnit,

            CoreError::Remote { message, status } => CliError::Remote {
                message: match status {
                    Some(code) => format!("{message} (HTTP {code})"),
                    None => message,
                },
            },

            CoreError::FeatureNotFound { feature_id } => CliError::NotFound {
                resource_type: "feature".into(),
                identifier: feature_id.to_string(),
            },

            CoreError::AccessoryNotFound { identifier } => CliError::NotFound {
                resource_type: "accessory".into(),
                identifier,
            },

            CoreError::CharacteristicNotFound {
                accessory,
                characteristic,
            } => CliError::NotFound {
                resource_type: "characteristic".into(),
                identifier: format!("{accessory} / {characteristic}"),
            },

            CoreError::ReadOnly { characteristic } => CliError::Validation {
                field: characteristic,
                reason: "characteristic is read-only".into(),
            },

            CoreError::Validation { message } => CliError::Validation {
                field: "value".into(),
                reason: message,
            },

            CoreError::Store { message } => CliError::Store { message },

            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                path: iotas_config::config_path().display().to_string(),
            },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (CoreError::NotAuthenticated, exit_code::AUTH),
            (CoreError::NoUnit, exit_code::NOT_FOUND),
            (
                CoreError::AccessoryNotFound {
                    identifier: "Porch".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::ReadOnly {
                    characteristic: "current-temperature".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::Remote {
                    message: "boom".into(),
                    status: Some(500),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::Store {
                    message: "disk full".into(),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn unknown_profile_points_at_config_init() {
        let err = CliError::from(ConfigError::UnknownProfile {
            profile: "home".into(),
        });
        assert!(matches!(err, CliError::ProfileNotFound { ref name, .. } if name == "home"));
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
