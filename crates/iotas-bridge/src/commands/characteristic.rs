//! Single characteristic get/set, routed through the same bridge the
//! headless runner serves.

use std::str::FromStr;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use iotas_core::{Characteristic, CharacteristicValue};

use crate::cli::{GlobalOpts, ReadArgs, WriteArgs};
use crate::error::CliError;
use crate::output;

use super::discovered_platform;

#[derive(Debug, Serialize)]
struct Reading {
    accessory: String,
    uuid: Uuid,
    characteristic: Characteristic,
    value: CharacteristicValue,
}

fn parse_characteristic(raw: &str) -> Result<Characteristic, CliError> {
    Characteristic::from_str(raw.trim()).map_err(|_| CliError::Validation {
        field: "characteristic".into(),
        reason: format!(
            "unknown characteristic '{raw}'. Valid: on, brightness, current-temperature, \
             heating-threshold-temperature, cooling-threshold-temperature, \
             target-temperature, target-heating-cooling-state, battery-level"
        ),
    })
}

pub async fn read(args: ReadArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let characteristic = parse_characteristic(&args.characteristic)?;
    let platform = discovered_platform(global).await?;
    let accessory = platform.resolve(&args.accessory)?;

    let value = platform.read(accessory.uuid, characteristic).await?;
    let reading = Reading {
        accessory: accessory.display_name,
        uuid: accessory.uuid,
        characteristic,
        value,
    };

    let out = output::render_single(
        &global.output,
        &reading,
        |r| format!("{} {}: {}", r.accessory, r.characteristic, r.value),
        |r| r.value.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn write(args: WriteArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let characteristic = parse_characteristic(&args.characteristic)?;
    let value = characteristic.parse_value(&args.value)?;
    let platform = discovered_platform(global).await?;
    let accessory = platform.resolve(&args.accessory)?;

    platform.write(accessory.uuid, characteristic, value).await?;
    info!(accessory = %accessory.display_name, %characteristic, %value, "characteristic written");

    if !global.quiet {
        eprintln!("✓ {} {characteristic} set to {value}", accessory.display_name);
    }
    Ok(())
}
