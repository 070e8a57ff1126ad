// ── Accessory shape ──

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use iotas_api::Device;

use super::capability::{Binding, ServiceKind};
use crate::classify::classify;

/// Namespace for accessory UUIDs. Changing it re-keys every accessory.
const ACCESSORY_NAMESPACE: Uuid = Uuid::from_bytes([
    0x5c, 0x1d, 0x7a, 0x4e, 0x90, 0x3b, 0x4f, 0x62, 0xa8, 0x17, 0x2e, 0x6b, 0xd4, 0x05, 0xc3, 0x91,
]);

pub const MANUFACTURER: &str = "IOTAS";

/// Deterministic accessory UUID for a device id.
pub fn accessory_uuid(device_id: u64) -> Uuid {
    Uuid::new_v5(&ACCESSORY_NAMESPACE, device_id.to_string().as_bytes())
}

/// Static accessory information shown by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryInfo {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
}

/// Context persisted by the host next to the accessory. Bindings are
/// re-derived from it on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryContext {
    pub room_name: String,
    pub device: Device,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessory {
    pub uuid: Uuid,
    pub display_name: String,
    pub info: AccessoryInfo,
    /// Services currently exposed, recomputed on every update.
    pub services: Vec<ServiceKind>,
    pub context: AccessoryContext,
}

impl Accessory {
    pub fn from_device(room_name: &str, device: &Device) -> Self {
        let mut accessory = Self {
            uuid: accessory_uuid(device.id),
            display_name: format!("{room_name} {}", device.name),
            info: AccessoryInfo {
                manufacturer: MANUFACTURER.to_owned(),
                model: device.category.clone(),
                serial_number: device
                    .serial_number
                    .clone()
                    .unwrap_or_else(|| device.id.to_string()),
            },
            services: Vec::new(),
            context: AccessoryContext {
                room_name: room_name.to_owned(),
                device: device.clone(),
            },
        };
        accessory.services = services_of(&accessory.bindings());
        accessory
    }

    pub fn device_id(&self) -> u64 {
        self.context.device.id
    }

    pub fn bindings(&self) -> Vec<Binding> {
        classify(&self.context.device)
    }
}

/// Distinct services in binding order.
pub(crate) fn services_of(bindings: &[Binding]) -> Vec<ServiceKind> {
    let mut services = Vec::new();
    for binding in bindings {
        if !services.contains(&binding.service) {
            services.push(binding.service);
        }
    }
    services
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub added: Vec<Uuid>,
    pub updated: Vec<Uuid>,
    pub removed: Vec<Uuid>,
    /// Devices without any usable feature.
    pub skipped: usize,
    /// Accessories the store refused; the next pass retries them.
    pub failed: Vec<Uuid>,
}
