// ── Feature classification ──
//
// Pure mapping from a device's loosely-typed feature list to the
// capability bindings it exposes. Unknown combinations produce nothing.

use iotas_api::{Device, Feature};

use crate::model::{
    Binding, CapabilityKind, Characteristic, ModeTable, ServiceKind, SetPointRole,
};

const ON_OFF: &str = "OnOff";
const LEVEL: &str = "Level";
const TEMPERATURE: &str = "Temperature";
const THERMOSTAT_MODE: &str = "ThermostatMode";

const SWITCH_TYPES: [&str; 3] = ["Lock", "Light", "Operation Mode"];

const CATEGORY_LIGHT: &str = "light";
const CATEGORY_CURRENT_TEMPERATURE: &str = "current_temperature";
const CATEGORY_HEAT_SET_POINT: &str = "heat_set_point";
const CATEGORY_COOL_SET_POINT: &str = "cool_set_point";
const CATEGORY_BATTERY: &str = "battery";

/// Settable features, plus the read-only sensors we still surface.
fn is_eligible(feature: &Feature) -> bool {
    feature.feature_type_settable
        || feature.feature_type_category == CATEGORY_CURRENT_TEMPERATURE
        || feature.feature_type_category == CATEGORY_BATTERY
}

/// Derive the capability bindings of a device.
///
/// Each eligible feature is matched against the rules in order and the
/// first hit wins. A thermostat with heat and cool set points plus a mode
/// feature additionally gets a mode-dependent target temperature.
pub fn classify(device: &Device) -> Vec<Binding> {
    let is_thermostat = device.features.iter().any(|f| {
        f.event_type_name == THERMOSTAT_MODE
            || f.feature_type_category == CATEGORY_HEAT_SET_POINT
            || f.feature_type_category == CATEGORY_COOL_SET_POINT
    });
    let climate_service = if is_thermostat {
        ServiceKind::Thermostat
    } else {
        ServiceKind::TemperatureSensor
    };

    let mut bindings = Vec::new();
    let mut heat = None;
    let mut cool = None;
    let mut mode = None;

    for feature in device.features.iter().filter(|f| is_eligible(f)) {
        let event = feature.event_type_name.as_str();
        let category = feature.feature_type_category.as_str();

        if event == ON_OFF && SWITCH_TYPES.contains(&feature.feature_type_name.as_str()) {
            bindings.push(Binding {
                service: ServiceKind::Switch,
                characteristic: Characteristic::On,
                capability: CapabilityKind::Switch {
                    feature: feature.id,
                },
            });
        } else if event == LEVEL && category == CATEGORY_LIGHT {
            bindings.push(Binding {
                service: ServiceKind::Lightbulb,
                characteristic: Characteristic::On,
                capability: CapabilityKind::LightPower {
                    feature: feature.id,
                },
            });
            bindings.push(Binding {
                service: ServiceKind::Lightbulb,
                characteristic: Characteristic::Brightness,
                capability: CapabilityKind::Brightness {
                    feature: feature.id,
                },
            });
        } else if event == TEMPERATURE {
            match category {
                CATEGORY_CURRENT_TEMPERATURE => bindings.push(Binding {
                    service: climate_service,
                    characteristic: Characteristic::CurrentTemperature,
                    capability: CapabilityKind::CurrentTemperature {
                        feature: feature.id,
                    },
                }),
                CATEGORY_HEAT_SET_POINT => {
                    heat = Some(feature.id);
                    bindings.push(set_point(feature.id, SetPointRole::Heat));
                }
                CATEGORY_COOL_SET_POINT => {
                    cool = Some(feature.id);
                    bindings.push(set_point(feature.id, SetPointRole::Cool));
                }
                _ => {}
            }
        } else if event == THERMOSTAT_MODE {
            let table = ModeTable::parse(feature.values.as_deref().unwrap_or_default());
            mode = Some((feature.id, table.clone()));
            bindings.push(Binding {
                service: ServiceKind::Thermostat,
                characteristic: Characteristic::TargetHeatingCoolingState,
                capability: CapabilityKind::ThermostatMode {
                    feature: feature.id,
                    table,
                },
            });
        } else if feature.feature_type_name == "Battery" {
            bindings.push(Binding {
                service: ServiceKind::Battery,
                characteristic: Characteristic::BatteryLevel,
                capability: CapabilityKind::Battery {
                    feature: feature.id,
                },
            });
        }
    }

    if let (Some(heat), Some(cool), Some((mode, table))) = (heat, cool, mode) {
        bindings.push(Binding {
            service: ServiceKind::Thermostat,
            characteristic: Characteristic::TargetTemperature,
            capability: CapabilityKind::ThermostatTarget {
                mode,
                heat,
                cool,
                table,
            },
        });
    }

    bindings
}

fn set_point(feature: u64, role: SetPointRole) -> Binding {
    let characteristic = match role {
        SetPointRole::Heat => Characteristic::HeatingThresholdTemperature,
        SetPointRole::Cool => Characteristic::CoolingThresholdTemperature,
    };
    Binding {
        service: ServiceKind::Thermostat,
        characteristic,
        capability: CapabilityKind::ThermostatSetPoint { feature, role },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::ThermostatState;
    use crate::testing::{device, feature, mode_feature, read_only};

    #[test]
    fn on_off_light_is_a_switch() {
        let dev = device(1, "Lamp", vec![feature(10, "OnOff", "Light", "light", 0.0)]);
        assert_eq!(
            classify(&dev),
            vec![Binding {
                service: ServiceKind::Switch,
                characteristic: Characteristic::On,
                capability: CapabilityKind::Switch { feature: 10 },
            }]
        );
    }

    #[test]
    fn operation_mode_and_lock_are_switches() {
        let dev = device(
            1,
            "Door",
            vec![
                feature(10, "OnOff", "Lock", "lock", 0.0),
                feature(11, "OnOff", "Operation Mode", "operation_mode", 1.0),
            ],
        );
        let bindings = classify(&dev);
        assert_eq!(bindings.len(), 2);
        assert!(bindings.iter().all(|b| b.service == ServiceKind::Switch));
    }

    #[test]
    fn dimmer_yields_brightness_and_power_on_one_feature() {
        let dev = device(2, "Dimmer", vec![feature(20, "Level", "Dimmer", "light", 0.3)]);
        let bindings = classify(&dev);
        assert_eq!(bindings.len(), 2);
        assert!(bindings.iter().all(|b| b.service == ServiceKind::Lightbulb));
        assert!(bindings.iter().all(|b| b.capability.feature_ids() == vec![20]));
        assert!(
            bindings
                .iter()
                .any(|b| b.capability == CapabilityKind::Brightness { feature: 20 })
        );
        assert!(
            bindings
                .iter()
                .any(|b| b.capability == CapabilityKind::LightPower { feature: 20 })
        );
    }

    #[test]
    fn thermostat_gets_derived_target() {
        let dev = device(
            3,
            "Thermostat",
            vec![
                read_only(feature(30, "Temperature", "Temperature", "current_temperature", 70.0)),
                feature(31, "Temperature", "Heat Set Point", "heat_set_point", 68.0),
                feature(32, "Temperature", "Cool Set Point", "cool_set_point", 76.0),
                mode_feature(33, 2.0, "Off:Heat:Cool:Auto"),
            ],
        );
        let bindings = classify(&dev);
        assert_eq!(bindings.len(), 5);
        assert!(bindings.iter().all(|b| b.service == ServiceKind::Thermostat));

        let target = bindings
            .iter()
            .find(|b| b.characteristic == Characteristic::TargetTemperature)
            .map(|b| b.capability.clone());
        match target {
            Some(CapabilityKind::ThermostatTarget {
                mode,
                heat,
                cool,
                table,
            }) => {
                assert_eq!((mode, heat, cool), (33, 31, 32));
                assert_eq!(table.state_at(2.0), Some(ThermostatState::Cool));
            }
            other => panic!("expected a thermostat target, got {other:?}"),
        }
    }

    #[test]
    fn target_needs_both_set_points_and_mode() {
        let dev = device(
            3,
            "Heater",
            vec![
                feature(31, "Temperature", "Heat Set Point", "heat_set_point", 68.0),
                mode_feature(33, 1.0, "Off:Heat"),
            ],
        );
        let bindings = classify(&dev);
        assert!(
            bindings
                .iter()
                .all(|b| b.characteristic != Characteristic::TargetTemperature)
        );
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn lone_sensor_uses_temperature_sensor_service() {
        let dev = device(
            4,
            "Sensor",
            vec![
                read_only(feature(40, "Temperature", "Temperature", "current_temperature", 71.0)),
                read_only(feature(41, "Level", "Battery", "battery", 88.0)),
            ],
        );
        let services: Vec<_> = classify(&dev).into_iter().map(|b| b.service).collect();
        assert_eq!(
            services,
            vec![ServiceKind::TemperatureSensor, ServiceKind::Battery]
        );
    }

    #[test]
    fn ineligible_and_unknown_features_yield_nothing() {
        let dev = device(
            5,
            "Motion",
            vec![
                read_only(feature(50, "OnOff", "Light", "light", 1.0)),
                feature(51, "Motion", "Motion", "motion", 0.0),
            ],
        );
        assert!(classify(&dev).is_empty());
    }
}
