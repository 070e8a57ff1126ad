// iotas-api: Async Rust client for the IOTAS cloud API
//
// Thin transport layer: URL construction, bearer/basic auth, status
// handling and the serde wire models. Session state (token caching,
// unit resolution, deduplication) lives in `iotas-core`.

pub mod auth;
pub mod client;
pub mod error;
pub mod transport;
pub mod types;

mod resources;

pub use auth::TokenGrant;
pub use client::{DEFAULT_BASE_URL, IotasClient};
pub use error::Error;
pub use transport::TransportConfig;
pub use types::{Account, Device, Feature, Residency, Room};
