// ── Domain model ──
//
// Capability bindings derived from IOTAS features, and the accessory
// shape handed to the host store.

pub mod accessory;
pub mod capability;

pub use accessory::{Accessory, AccessoryContext, AccessoryInfo, SyncReport, accessory_uuid};
pub use capability::{
    Binding, CapabilityKind, Characteristic, CharacteristicValue, ModeTable, ServiceKind,
    SetPointRole, ThermostatState,
};
