// ── Accessory reconciliation ──
//
// Diffs the remote device set against the registered accessories and
// tells the store what changed. Accessory identity is the device-derived
// UUID, so repeated passes never register twice.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use iotas_api::Room;

use crate::error::CoreError;
use crate::model::accessory::services_of;
use crate::model::{Accessory, Binding, Characteristic, SyncReport, accessory_uuid};
use crate::store::AccessoryStore;

/// A registered accessory with its derived bindings.
#[derive(Debug, Clone)]
pub(crate) struct Registered {
    pub(crate) accessory: Accessory,
    pub(crate) bindings: Vec<Binding>,
}

impl Registered {
    fn new(mut accessory: Accessory) -> Self {
        let bindings = accessory.bindings();
        accessory.services = services_of(&bindings);
        Self {
            accessory,
            bindings,
        }
    }
}

pub struct AccessorySynchronizer {
    store: Arc<dyn AccessoryStore>,
    registry: DashMap<Uuid, Registered>,
    /// Held for a whole pass so concurrent discoveries cannot both
    /// register the same accessory.
    pass: Mutex<()>,
}

impl AccessorySynchronizer {
    pub fn new(store: Arc<dyn AccessoryStore>) -> Self {
        Self {
            store,
            registry: DashMap::new(),
            pass: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn AccessoryStore> {
        &self.store
    }

    /// Re-attach an accessory persisted by the host. Bindings are derived
    /// from its stored context; the store is not notified.
    pub fn restore(&self, accessory: Accessory) {
        let registered = Registered::new(accessory);
        debug!(
            uuid = %registered.accessory.uuid,
            name = %registered.accessory.display_name,
            bindings = registered.bindings.len(),
            "restored accessory from cache"
        );
        self.registry.insert(registered.accessory.uuid, registered);
    }

    /// One full reconciliation pass over the room graph.
    ///
    /// A store failure for one accessory is logged and recorded in the
    /// report; the rest of the pass still runs. An accessory the store
    /// refused to register stays unknown, and one it refused to remove
    /// stays registered, so the next pass retries both.
    pub fn sync(&self, rooms: &[Room]) -> Result<SyncReport, CoreError> {
        let _pass = self.pass.lock().map_err(|_| CoreError::Store {
            message: "accessory sync lock poisoned".into(),
        })?;
        let mut report = SyncReport::default();
        let mut seen = HashSet::new();

        for room in rooms {
            for device in &room.devices {
                let uuid = accessory_uuid(device.id);
                let registered = Registered::new(Accessory::from_device(&room.name, device));
                if registered.bindings.is_empty() {
                    debug!(device_id = device.id, name = %device.name, "no usable features, skipping");
                    report.skipped += 1;
                    continue;
                }
                seen.insert(uuid);

                let name = registered.accessory.display_name.clone();
                if self.registry.contains_key(&uuid) {
                    if let Err(e) = self.store.update(&registered.accessory) {
                        warn!(error = %e, %name, "failed to update accessory");
                        report.failed.push(uuid);
                    } else {
                        report.updated.push(uuid);
                    }
                    self.registry.insert(uuid, registered);
                } else {
                    info!(%name, "adding new accessory");
                    match self.store.register(&registered.accessory) {
                        Ok(()) => {
                            self.registry.insert(uuid, registered);
                            report.added.push(uuid);
                        }
                        Err(e) => {
                            warn!(error = %e, %name, "failed to register accessory");
                            report.failed.push(uuid);
                        }
                    }
                }
            }
        }

        let stale: Vec<Registered> = self
            .registry
            .iter()
            .filter(|entry| !seen.contains(entry.key()))
            .map(|entry| entry.value().clone())
            .collect();
        for registered in stale {
            let uuid = registered.accessory.uuid;
            let name = &registered.accessory.display_name;
            info!(%name, "removing stale accessory");
            match self.store.unregister(&registered.accessory) {
                Ok(()) => {
                    self.registry.remove(&uuid);
                    report.removed.push(uuid);
                }
                Err(e) => {
                    warn!(error = %e, %name, "failed to remove accessory");
                    report.failed.push(uuid);
                }
            }
        }

        info!(
            added = report.added.len(),
            updated = report.updated.len(),
            removed = report.removed.len(),
            skipped = report.skipped,
            failed = report.failed.len(),
            "accessory sync complete"
        );
        Ok(report)
    }

    /// Snapshot of every registered accessory.
    pub fn accessories(&self) -> Vec<Accessory> {
        let mut accessories: Vec<Accessory> = self
            .registry
            .iter()
            .map(|entry| entry.accessory.clone())
            .collect();
        accessories.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        accessories
    }

    /// Find an accessory by UUID, device id or display name.
    pub fn resolve(&self, identifier: &str) -> Result<Accessory, CoreError> {
        let identifier = identifier.trim();
        let by_uuid = Uuid::parse_str(identifier).ok();
        let by_device = identifier.parse::<u64>().ok();

        self.registry
            .iter()
            .find(|entry| {
                let accessory = &entry.accessory;
                by_uuid == Some(accessory.uuid)
                    || by_device == Some(accessory.device_id())
                    || accessory.display_name.eq_ignore_ascii_case(identifier)
            })
            .map(|entry| entry.accessory.clone())
            .ok_or_else(|| CoreError::AccessoryNotFound {
                identifier: identifier.to_owned(),
            })
    }

    /// The binding behind one characteristic of a registered accessory.
    pub fn binding(
        &self,
        uuid: Uuid,
        characteristic: Characteristic,
    ) -> Result<Binding, CoreError> {
        let entry = self
            .registry
            .get(&uuid)
            .ok_or_else(|| CoreError::AccessoryNotFound {
                identifier: uuid.to_string(),
            })?;
        entry
            .bindings
            .iter()
            .find(|b| b.characteristic == characteristic)
            .cloned()
            .ok_or_else(|| CoreError::CharacteristicNotFound {
                accessory: entry.accessory.display_name.clone(),
                characteristic: characteristic.to_string(),
            })
    }

    /// Every binding of a registered accessory.
    pub fn bindings(&self, uuid: Uuid) -> Vec<Binding> {
        self.registry
            .get(&uuid)
            .map(|entry| entry.bindings.clone())
            .unwrap_or_default()
    }
}
