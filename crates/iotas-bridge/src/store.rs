//! JSON file accessory store.
//!
//! Stands in for the accessory host: registered accessories survive
//! restarts so `run` can restore them before the first discovery, and
//! values pushed by the bridge are kept alongside for inspection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use iotas_core::{Accessory, AccessoryStore, Characteristic, CharacteristicValue, CoreError};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    accessories: Vec<Accessory>,
    #[serde(default)]
    values: HashMap<Uuid, HashMap<Characteristic, CharacteristicValue>>,
}

impl CacheFile {
    fn position(&self, uuid: Uuid) -> Option<usize> {
        self.accessories.iter().position(|a| a.uuid == uuid)
    }
}

pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<CacheFile>,
}

impl JsonFileStore {
    /// Open the cache at `path`. A missing file is an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| CoreError::Store {
                message: format!("{}: {e}", path.display()),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheFile::default(),
            Err(e) => {
                return Err(CoreError::Store {
                    message: format!("{}: {e}", path.display()),
                });
            }
        };
        debug!(path = %path.display(), accessories = state.accessories.len(), "opened accessory cache");
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheFile>, CoreError> {
        self.state.lock().map_err(|_| CoreError::Store {
            message: "accessory cache lock poisoned".into(),
        })
    }

    /// Write through a temp file and rename so a crash never leaves a
    /// truncated cache behind.
    fn persist(&self, state: &CacheFile) -> Result<(), CoreError> {
        let store_err = |e: &dyn std::fmt::Display| CoreError::Store {
            message: format!("{}: {e}", self.path.display()),
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| store_err(&e))?;
        }
        let json = serde_json::to_string_pretty(state).map_err(|e| store_err(&e))?;
        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, json).map_err(|e| store_err(&e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| store_err(&e))?;
        Ok(())
    }

    /// Apply `change` to a copy of the cache and keep it only once the
    /// copy is on disk, so memory never runs ahead of the file.
    fn commit(
        &self,
        change: impl FnOnce(&mut CacheFile) -> Result<(), CoreError>,
    ) -> Result<(), CoreError> {
        let mut state = self.lock()?;
        let mut next = state.clone();
        change(&mut next)?;
        self.persist(&next)?;
        *state = next;
        Ok(())
    }
}

impl AccessoryStore for JsonFileStore {
    fn cached(&self) -> Result<Vec<Accessory>, CoreError> {
        Ok(self.lock()?.accessories.clone())
    }

    fn register(&self, accessory: &Accessory) -> Result<(), CoreError> {
        self.commit(|state| {
            if state.position(accessory.uuid).is_some() {
                return Err(CoreError::Store {
                    message: format!("accessory {} is already registered", accessory.uuid),
                });
            }
            state.accessories.push(accessory.clone());
            Ok(())
        })
    }

    fn update(&self, accessory: &Accessory) -> Result<(), CoreError> {
        self.commit(|state| {
            match state.position(accessory.uuid) {
                Some(index) => state.accessories[index] = accessory.clone(),
                None => state.accessories.push(accessory.clone()),
            }
            Ok(())
        })
    }

    fn unregister(&self, accessory: &Accessory) -> Result<(), CoreError> {
        self.commit(|state| {
            state.accessories.retain(|a| a.uuid != accessory.uuid);
            state.values.remove(&accessory.uuid);
            Ok(())
        })
    }

    fn update_characteristic(
        &self,
        uuid: Uuid,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) {
        let pushed = self.commit(|state| {
            state
                .values
                .entry(uuid)
                .or_default()
                .insert(characteristic, value);
            Ok(())
        });
        if let Err(e) = pushed {
            warn!(error = %e, %uuid, %characteristic, "failed to persist pushed value");
        }
    }
}
