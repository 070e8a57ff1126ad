//! Device command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;
use tracing::debug;
use uuid::Uuid;

use iotas_core::{
    Accessory, Binding, Characteristic, CharacteristicValue, Device, MemoryStore, Platform,
    ServiceKind, accessory_uuid, classify,
};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{ActiveProfile, discovered_platform};

// ── Views ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct DeviceView {
    id: u64,
    uuid: Uuid,
    room: String,
    name: String,
    category: String,
    services: Vec<ServiceKind>,
    characteristics: Vec<Characteristic>,
}

impl DeviceView {
    fn new(room: &str, device: &Device) -> Self {
        let bindings = classify(device);
        let mut services: Vec<ServiceKind> = Vec::new();
        for binding in &bindings {
            if !services.contains(&binding.service) {
                services.push(binding.service);
            }
        }
        Self {
            id: device.id,
            uuid: accessory_uuid(device.id),
            room: room.to_owned(),
            name: device.name.clone(),
            category: device.category.clone(),
            services,
            characteristics: bindings.iter().map(|b| b.characteristic).collect(),
        }
    }
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Room")]
    room: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Services")]
    services: String,
    #[tabled(rename = "Characteristics")]
    characteristics: String,
}

fn row(d: &DeviceView) -> DeviceRow {
    let join = |items: Vec<String>| {
        if items.is_empty() {
            "-".to_owned()
        } else {
            items.join(", ")
        }
    };
    DeviceRow {
        id: d.id,
        room: d.room.clone(),
        name: d.name.clone(),
        category: d.category.clone(),
        services: join(d.services.iter().map(ToString::to_string).collect()),
        characteristics: join(d.characteristics.iter().map(ToString::to_string).collect()),
    }
}

#[derive(Debug, Serialize)]
struct CharacteristicState {
    service: ServiceKind,
    characteristic: Characteristic,
    features: Vec<u64>,
    writable: bool,
    value: Option<CharacteristicValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct AccessoryDetail {
    accessory: Accessory,
    characteristics: Vec<CharacteristicState>,
}

fn detail(d: &AccessoryDetail) -> String {
    let a = &d.accessory;
    let mut lines = vec![
        format!("Name:          {}", a.display_name),
        format!("UUID:          {}", a.uuid),
        format!("Device:        {}", a.device_id()),
        format!("Room:          {}", a.context.room_name),
        format!("Model:         {}", a.info.model),
        format!("Serial:        {}", a.info.serial_number),
        String::new(),
    ];
    for c in &d.characteristics {
        let value = match (&c.value, &c.error) {
            (Some(v), _) => v.to_string(),
            (None, Some(e)) => format!("error: {e}"),
            (None, None) => "-".to_owned(),
        };
        let access = if c.writable { "rw" } else { "r " };
        lines.push(format!(
            "{:<18} {:<30} {access}  {value}",
            c.service.to_string(),
            c.characteristic.to_string(),
        ));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List { all } => {
            let active = ActiveProfile::resolve(global)?;
            let platform =
                Platform::connect(active.platform_config()?, Arc::new(MemoryStore::new()))?;
            let rooms = platform.rooms().await?;

            let views: Vec<DeviceView> = rooms
                .iter()
                .flat_map(|room| {
                    room.devices
                        .iter()
                        .map(|device| DeviceView::new(&room.name, device))
                })
                .filter(|view| all || !view.characteristics.is_empty())
                .collect();
            debug!(count = views.len(), "listing devices");

            let out = output::render_list(&global.output, &views, row, |v| v.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { identifier } => {
            let platform = discovered_platform(global).await?;
            let accessory = platform.resolve(&identifier)?;

            let mut characteristics = Vec::new();
            for binding in platform.bindings(accessory.uuid) {
                characteristics.push(read_state(&platform, accessory.uuid, &binding).await);
            }
            let view = AccessoryDetail {
                accessory,
                characteristics,
            };

            let out = output::render_single(&global.output, &view, detail, |v| {
                v.accessory.uuid.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

async fn read_state(platform: &Platform, uuid: Uuid, binding: &Binding) -> CharacteristicState {
    let (value, error) = match platform.read(uuid, binding.characteristic).await {
        Ok(value) => (Some(value), None),
        Err(e) => (None, Some(e.to_string())),
    };
    CharacteristicState {
        service: binding.service,
        characteristic: binding.characteristic,
        features: binding.capability.feature_ids(),
        writable: binding.capability.is_writable(),
        value,
        error,
    }
}
