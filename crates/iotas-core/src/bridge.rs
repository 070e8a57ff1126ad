// ── Characteristic bridge ──
//
// Live get/set for every capability kind. Values are converted between
// the API's units and the host's, and light power writes are debounced
// against brightness writes on the same accessory.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::convert::{
    celsius_to_fahrenheit, fahrenheit_to_celsius, is_on, level_to_percent, on_value,
    percent_to_level,
};
use crate::error::CoreError;
use crate::model::{
    Binding, CapabilityKind, Characteristic, CharacteristicValue, ModeTable, SetPointRole,
};
use crate::session::TopologyCache;
use crate::store::AccessoryStore;

/// Timing of the light power debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTiming {
    /// Delay applied to every power write before deciding.
    pub settle: Duration,
    /// A power-on this soon after a brightness write is already satisfied.
    pub window: Duration,
}

impl Default for DebounceTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(50),
            window: Duration::from_millis(150),
        }
    }
}

pub struct CharacteristicBridge {
    topology: TopologyCache,
    store: Arc<dyn AccessoryStore>,
    last_brightness: DashMap<Uuid, Instant>,
    timing: DebounceTiming,
}

impl CharacteristicBridge {
    pub fn new(
        topology: TopologyCache,
        store: Arc<dyn AccessoryStore>,
        timing: DebounceTiming,
    ) -> Self {
        Self {
            topology,
            store,
            last_brightness: DashMap::new(),
            timing,
        }
    }

    /// Current value of a bound characteristic.
    pub async fn read(
        &self,
        accessory: Uuid,
        binding: &Binding,
    ) -> Result<CharacteristicValue, CoreError> {
        self.read_capability(&binding.capability)
            .await
            .inspect_err(|e| {
                error!(%accessory, characteristic = %binding.characteristic, error = %e, "read failed");
            })
    }

    /// Set a bound characteristic.
    pub async fn write(
        &self,
        accessory: Uuid,
        binding: &Binding,
        value: CharacteristicValue,
    ) -> Result<(), CoreError> {
        if !binding.capability.is_writable() {
            return Err(CoreError::ReadOnly {
                characteristic: binding.characteristic.to_string(),
            });
        }
        self.write_capability(accessory, &binding.capability, value)
            .await
            .inspect_err(|e| {
                error!(%accessory, characteristic = %binding.characteristic, error = %e, "write failed");
            })
    }

    async fn value(&self, feature_id: u64) -> Result<f64, CoreError> {
        Ok(self.topology.feature(feature_id).await?.value)
    }

    async fn set(&self, feature_id: u64, value: f64) -> Result<(), CoreError> {
        self.topology
            .session()
            .update_feature(feature_id, value)
            .await
    }

    async fn read_capability(
        &self,
        capability: &CapabilityKind,
    ) -> Result<CharacteristicValue, CoreError> {
        Ok(match capability {
            CapabilityKind::Switch { feature } | CapabilityKind::LightPower { feature } => {
                CharacteristicValue::Bool(is_on(self.value(*feature).await?))
            }
            CapabilityKind::Brightness { feature } => {
                CharacteristicValue::Number(level_to_percent(self.value(*feature).await?))
            }
            CapabilityKind::CurrentTemperature { feature }
            | CapabilityKind::ThermostatSetPoint { feature, .. } => {
                CharacteristicValue::Number(fahrenheit_to_celsius(self.value(*feature).await?))
            }
            CapabilityKind::ThermostatMode { feature, table } => {
                let index = self.value(*feature).await?;
                let state = table.state_at(index).ok_or_else(|| {
                    CoreError::validation(format!("mode index {index} is not in the mode table"))
                })?;
                CharacteristicValue::Mode(state)
            }
            CapabilityKind::ThermostatTarget {
                mode,
                heat,
                cool,
                table,
            } => {
                let fahrenheit = match self.active_set_point(*mode, table).await? {
                    Some(SetPointRole::Cool) => self.value(*cool).await?,
                    Some(SetPointRole::Heat) => self.value(*heat).await?,
                    None => {
                        let heat = self.value(*heat).await?;
                        let cool = self.value(*cool).await?;
                        (heat + cool) / 2.0
                    }
                };
                CharacteristicValue::Number(fahrenheit_to_celsius(fahrenheit))
            }
            CapabilityKind::Battery { feature } => {
                CharacteristicValue::Number(self.value(*feature).await?)
            }
        })
    }

    async fn write_capability(
        &self,
        accessory: Uuid,
        capability: &CapabilityKind,
        value: CharacteristicValue,
    ) -> Result<(), CoreError> {
        match capability {
            CapabilityKind::Switch { feature } => self.set(*feature, on_value(value.as_bool()?)).await,
            CapabilityKind::Brightness { feature } => {
                let percent = value.as_number()?;
                self.last_brightness.insert(accessory, Instant::now());
                self.set(*feature, percent_to_level(percent)).await?;
                self.push(
                    accessory,
                    Characteristic::Brightness,
                    CharacteristicValue::Number(percent),
                )
                .await;
                Ok(())
            }
            CapabilityKind::LightPower { feature } => {
                self.write_light_power(accessory, *feature, value.as_bool()?)
                    .await
            }
            CapabilityKind::ThermostatSetPoint { feature, .. } => {
                self.set(*feature, celsius_to_fahrenheit(value.as_number()?))
                    .await
            }
            CapabilityKind::ThermostatMode { feature, table } => {
                let state = value.as_mode()?;
                let index = table.value_of(state).ok_or_else(|| {
                    CoreError::validation(format!("thermostat does not support {state} mode"))
                })?;
                self.set(*feature, index).await
            }
            CapabilityKind::ThermostatTarget {
                mode,
                heat,
                cool,
                table,
            } => {
                let fahrenheit = celsius_to_fahrenheit(value.as_number()?);
                match self.active_set_point(*mode, table).await? {
                    Some(SetPointRole::Cool) => self.set(*cool, fahrenheit).await,
                    Some(SetPointRole::Heat) => self.set(*heat, fahrenheit).await,
                    None => {
                        debug!(%accessory, "no heat or cool mode active, target write ignored");
                        Ok(())
                    }
                }
            }
            CapabilityKind::CurrentTemperature { .. } | CapabilityKind::Battery { .. } => {
                Err(CoreError::ReadOnly {
                    characteristic: format!("{capability:?}"),
                })
            }
        }
    }

    /// Debounced power write for dimmable lights.
    ///
    /// Hosts follow a brightness change with a synthesized power-on. That
    /// write is dropped when it lands inside the window of the brightness
    /// write, so it cannot overwrite the level just set.
    async fn write_light_power(&self, accessory: Uuid, feature: u64, on: bool) -> Result<(), CoreError> {
        tokio::time::sleep(self.timing.settle).await;

        let recent = self
            .last_brightness
            .get(&accessory)
            .is_some_and(|at| at.elapsed() <= self.timing.window);
        if on && recent {
            debug!(%accessory, "power-on covered by recent brightness write");
            return Ok(());
        }

        self.set(feature, on_value(on)).await?;
        self.push(
            accessory,
            Characteristic::Brightness,
            CharacteristicValue::Number(if on { 100.0 } else { 0.0 }),
        )
        .await;
        Ok(())
    }

    /// Hand a locally changed value to the host off the async workers.
    async fn push(
        &self,
        accessory: Uuid,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) {
        let store = Arc::clone(&self.store);
        let pushed = tokio::task::spawn_blocking(move || {
            store.update_characteristic(accessory, characteristic, value);
        })
        .await;
        if let Err(e) = pushed {
            warn!(%accessory, %characteristic, error = %e, "characteristic push did not complete");
        }
    }

    /// Which set point the active thermostat mode drives, if any.
    async fn active_set_point(
        &self,
        mode: u64,
        table: &ModeTable,
    ) -> Result<Option<SetPointRole>, CoreError> {
        let index = self.value(mode).await?;
        let name = table.name_at(index).unwrap_or_default().to_ascii_lowercase();
        Ok(if name.contains("cool") {
            Some(SetPointRole::Cool)
        } else if name.contains("heat") {
            Some(SetPointRole::Heat)
        } else {
            None
        })
    }
}
