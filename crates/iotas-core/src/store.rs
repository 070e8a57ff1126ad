// ── Accessory store seam ──
//
// The host owns accessory persistence. The core only tells it what was
// added, updated or removed, and pushes characteristic values it
// changed locally.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Accessory, Characteristic, CharacteristicValue};

/// Host-side accessory registry.
///
/// Methods are synchronous. Calls made while serving async requests
/// (reconciliation and value pushes) run on the blocking pool, so an
/// implementation is free to do file or network I/O.
pub trait AccessoryStore: Send + Sync {
    /// Accessories persisted from an earlier run. Read once at startup.
    fn cached(&self) -> Result<Vec<Accessory>, CoreError>;

    fn register(&self, accessory: &Accessory) -> Result<(), CoreError>;

    fn update(&self, accessory: &Accessory) -> Result<(), CoreError>;

    fn unregister(&self, accessory: &Accessory) -> Result<(), CoreError>;

    /// Refresh a characteristic value shown by the host without a read.
    fn update_characteristic(
        &self,
        uuid: Uuid,
        characteristic: Characteristic,
        value: CharacteristicValue,
    );
}

/// In-process store. Keeps every call observable, which makes it the
/// store of choice for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    accessories: DashMap<Uuid, Accessory>,
    pushed: Mutex<Vec<(Uuid, Characteristic, CharacteristicValue)>>,
    registrations: AtomicUsize,
    updates: AtomicUsize,
    removals: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with accessories as if persisted by a previous run.
    pub fn with_cached(accessories: impl IntoIterator<Item = Accessory>) -> Self {
        let store = Self::new();
        for accessory in accessories {
            store.accessories.insert(accessory.uuid, accessory);
        }
        store
    }

    pub fn get(&self, uuid: &Uuid) -> Option<Accessory> {
        self.accessories.get(uuid).map(|a| a.value().clone())
    }

    pub fn len(&self) -> usize {
        self.accessories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }

    /// Characteristic values pushed so far, oldest first.
    pub fn pushed(&self) -> Vec<(Uuid, Characteristic, CharacteristicValue)> {
        self.pushed
            .lock()
            .map(|pushed| pushed.clone())
            .unwrap_or_default()
    }
}

impl AccessoryStore for MemoryStore {
    fn cached(&self) -> Result<Vec<Accessory>, CoreError> {
        Ok(self.accessories.iter().map(|a| a.value().clone()).collect())
    }

    fn register(&self, accessory: &Accessory) -> Result<(), CoreError> {
        if self.accessories.contains_key(&accessory.uuid) {
            return Err(CoreError::Store {
                message: format!("accessory {} is already registered", accessory.uuid),
            });
        }
        self.accessories.insert(accessory.uuid, accessory.clone());
        self.registrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn update(&self, accessory: &Accessory) -> Result<(), CoreError> {
        self.accessories.insert(accessory.uuid, accessory.clone());
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unregister(&self, accessory: &Accessory) -> Result<(), CoreError> {
        self.accessories.remove(&accessory.uuid);
        self.removals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn update_characteristic(
        &self,
        uuid: Uuid,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) {
        if let Ok(mut pushed) = self.pushed.lock() {
            pushed.push((uuid, characteristic, value));
        }
    }
}
