// ── Capability types ──

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;

/// Host service an accessory exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ServiceKind {
    Switch,
    Lightbulb,
    Thermostat,
    TemperatureSensor,
    Battery,
}

/// Host characteristic, one per binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum Characteristic {
    On,
    Brightness,
    CurrentTemperature,
    HeatingThresholdTemperature,
    CoolingThresholdTemperature,
    TargetTemperature,
    TargetHeatingCoolingState,
    BatteryLevel,
}

impl Characteristic {
    /// Parse a textual value (CLI input) into the shape this characteristic takes.
    pub fn parse_value(self, raw: &str) -> Result<CharacteristicValue, CoreError> {
        let raw = raw.trim();
        match self {
            Self::On => match raw.to_ascii_lowercase().as_str() {
                "true" | "on" | "1" => Ok(CharacteristicValue::Bool(true)),
                "false" | "off" | "0" => Ok(CharacteristicValue::Bool(false)),
                _ => Err(CoreError::validation(format!("expected on/off, got '{raw}'"))),
            },
            Self::TargetHeatingCoolingState => ThermostatState::from_str(raw)
                .map(CharacteristicValue::Mode)
                .map_err(|_| {
                    CoreError::validation(format!("expected off/heat/cool/auto, got '{raw}'"))
                }),
            _ => raw
                .parse::<f64>()
                .map(CharacteristicValue::Number)
                .map_err(|_| CoreError::validation(format!("expected a number, got '{raw}'"))),
        }
    }
}

/// Abstract thermostat state, the host's view of a remote mode entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ThermostatState {
    Off,
    Heat,
    Cool,
    Auto,
}

impl ThermostatState {
    /// Classify a remote mode name by substring.
    pub fn from_mode_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.contains("heat") {
            Self::Heat
        } else if name.contains("cool") {
            Self::Cool
        } else if name.contains("off") {
            Self::Off
        } else {
            Self::Auto
        }
    }
}

/// Value read from or written to a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Bool(bool),
    Number(f64),
    Mode(ThermostatState),
}

impl CharacteristicValue {
    pub fn as_bool(self) -> Result<bool, CoreError> {
        match self {
            Self::Bool(b) => Ok(b),
            Self::Number(n) => Ok(crate::convert::is_on(n)),
            Self::Mode(m) => Err(CoreError::validation(format!("expected boolean, got {m}"))),
        }
    }

    pub fn as_number(self) -> Result<f64, CoreError> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Bool(b) => Ok(if b { 1.0 } else { 0.0 }),
            Self::Mode(m) => Err(CoreError::validation(format!("expected number, got {m}"))),
        }
    }

    pub fn as_mode(self) -> Result<ThermostatState, CoreError> {
        match self {
            Self::Mode(m) => Ok(m),
            other => Err(CoreError::validation(format!(
                "expected thermostat state, got {other}"
            ))),
        }
    }
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", if *b { "on" } else { "off" }),
            Self::Number(n) => write!(f, "{n}"),
            Self::Mode(m) => write!(f, "{m}"),
        }
    }
}

/// Which thermostat threshold a set-point feature drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetPointRole {
    Heat,
    Cool,
}

// ── Mode table ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeEntry {
    pub name: String,
    pub state: ThermostatState,
}

/// Lookup between the remote mode index (a feature's `value`) and both
/// the remote mode name and the abstract [`ThermostatState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeTable {
    entries: Vec<ModeEntry>,
}

impl ModeTable {
    /// Build from a colon-delimited enumeration, e.g. `"Off:Heat:Cool:Auto"`.
    pub fn parse(values: &str) -> Self {
        let entries = values
            .split(':')
            .map(|name| ModeEntry {
                name: name.trim().to_owned(),
                state: ThermostatState::from_mode_name(name),
            })
            .collect();
        Self { entries }
    }

    /// Remote mode name at a feature value.
    pub fn name_at(&self, value: f64) -> Option<&str> {
        self.entry_at(value).map(|e| e.name.as_str())
    }

    /// Abstract state at a feature value.
    pub fn state_at(&self, value: f64) -> Option<ThermostatState> {
        self.entry_at(value).map(|e| e.state)
    }

    /// Feature value of the first entry mapping to `state`.
    pub fn value_of(&self, state: ThermostatState) -> Option<f64> {
        let index = self.entries.iter().position(|e| e.state == state)?;
        u32::try_from(index).ok().map(f64::from)
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::as_conversions
    )]
    fn entry_at(&self, value: f64) -> Option<&ModeEntry> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        self.entries.get(value.round() as usize)
    }
}

// ── Capabilities & bindings ─────────────────────────────────────────

/// What a binding does with its underlying feature(s).
///
/// Every variant names the feature ids it reads or writes; the bridge
/// matches exhaustively on this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CapabilityKind {
    /// Plain relay: remote > 0 is on.
    Switch { feature: u64 },
    /// Dimmer level, remote 0.0–1.0 ↔ local 0–100.
    Brightness { feature: u64 },
    /// On/off view of a dimmer level (debounced against brightness writes).
    LightPower { feature: u64 },
    /// Read-only ambient temperature, °F remote.
    CurrentTemperature { feature: u64 },
    /// Heating or cooling threshold, °F remote.
    ThermostatSetPoint { feature: u64, role: SetPointRole },
    /// Target temperature routed to a set point by the active mode.
    ThermostatTarget {
        mode: u64,
        heat: u64,
        cool: u64,
        table: ModeTable,
    },
    ThermostatMode { feature: u64, table: ModeTable },
    /// Read-only battery percentage.
    Battery { feature: u64 },
}

impl CapabilityKind {
    /// Every feature id this capability touches.
    pub fn feature_ids(&self) -> Vec<u64> {
        match self {
            Self::Switch { feature }
            | Self::Brightness { feature }
            | Self::LightPower { feature }
            | Self::CurrentTemperature { feature }
            | Self::ThermostatSetPoint { feature, .. }
            | Self::ThermostatMode { feature, .. }
            | Self::Battery { feature } => vec![*feature],
            Self::ThermostatTarget {
                mode, heat, cool, ..
            } => vec![*mode, *heat, *cool],
        }
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::CurrentTemperature { .. } | Self::Battery { .. })
    }
}

/// One exposed characteristic and the capability behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub service: ServiceKind,
    pub characteristic: Characteristic,
    pub capability: CapabilityKind,
}
