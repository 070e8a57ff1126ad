// IOTAS wire models
//
// Mirrors the JSON returned by the cloud API. Field names follow the
// API's camelCase; everything the bridge does not strictly need is
// defaulted so schema drift on the vendor side doesn't break decoding.

use serde::{Deserialize, Deserializer, Serialize};

/// `GET /account/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: u64,
    #[serde(default)]
    pub email: Option<String>,
}

/// One entry of `GET /account/{id}/residency`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Residency {
    #[serde(default)]
    pub id: Option<u64>,
    pub unit: u64,
    /// Display name of the unit, used for the `unit` config override.
    #[serde(default, alias = "name")]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub building_name: Option<String>,
}

/// A room with its devices, from `GET /unit/{unit}/rooms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: u64,
    pub unit: u64,
    pub name: String,
    #[serde(default)]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: u64,
    pub room: u64,
    #[serde(default)]
    pub device_template_id: u64,
    #[serde(default)]
    pub device_type: u64,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub movable: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub paired: bool,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// A single readable or controllable point on a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: u64,
    pub device: u64,
    #[serde(default)]
    pub event_type: u64,
    pub event_type_name: String,
    #[serde(default)]
    pub feature_type: u64,
    #[serde(default)]
    pub feature_type_name: String,
    #[serde(default)]
    pub feature_type_category: String,
    #[serde(default)]
    pub feature_type_settable: bool,
    #[serde(default)]
    pub name: String,
    /// Current value. The API sends either a number or a boolean;
    /// booleans are normalized to 1.0 / 0.0.
    #[serde(default, deserialize_with = "number_or_bool")]
    pub value: f64,
    /// Colon-delimited enumeration indexed by `value` (e.g. `"Off:Heat:Cool:Auto"`).
    #[serde(default)]
    pub values: Option<String>,
}

/// Body of `PUT /feature/{id}`.
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct FeatureUpdate {
    pub value: f64,
}

fn number_or_bool<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Bool(bool),
        Null,
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Bool(true) => 1.0,
        Raw::Bool(false) | Raw::Null => 0.0,
    })
}
