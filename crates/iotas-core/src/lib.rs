//! Synchronization and mapping engine between the IOTAS cloud API and a
//! smart-home accessory host.
//!
//! - **[`Platform`]** - Facade owning one authenticated session, the
//!   accessory registry and the characteristic bridge.
//!   [`discover()`](Platform::discover) resolves the unit, fetches the room
//!   graph and reconciles accessories; [`read()`](Platform::read) /
//!   [`write()`](Platform::write) serve live characteristic requests.
//!
//! - **[`TokenManager`]** / **[`TopologyCache`]** - Session state: cached
//!   bearer credential and resolved unit, with single-flight deduplication
//!   of grants and room fetches.
//!
//! - **[`classify()`]** - Pure mapping from a device's feature list to the
//!   capability [`Binding`]s it exposes.
//!
//! - **[`AccessorySynchronizer`]** - Add/update/remove reconciliation
//!   against an [`AccessoryStore`] supplied by the host.
//!
//! - **[`CharacteristicBridge`]** - Per-capability get/set, unit
//!   conversion and the brightness/on-off debounce.

pub mod bridge;
pub mod classify;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod platform;
pub mod session;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{CharacteristicBridge, DebounceTiming};
pub use classify::classify;
pub use config::PlatformConfig;
pub use error::CoreError;
pub use model::{
    Accessory, AccessoryContext, AccessoryInfo, Binding, CapabilityKind, Characteristic,
    CharacteristicValue, ModeTable, ServiceKind, SetPointRole, SyncReport, ThermostatState,
    accessory_uuid,
};
pub use platform::Platform;
pub use session::{IotasApi, Session, TokenManager, TopologyCache};
pub use store::{AccessoryStore, MemoryStore};
pub use sync::AccessorySynchronizer;

// Wire types are part of the public surface (accessory context, CLI output).
pub use iotas_api::{Device, Feature, Room};
