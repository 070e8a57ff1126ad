//! One reconciliation pass against the accessory cache.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use iotas_core::{AccessoryStore, MemoryStore, Platform};

use crate::cli::{GlobalOpts, SyncArgs};
use crate::error::CliError;
use crate::output;
use crate::store::JsonFileStore;

use super::ActiveProfile;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Action {
    Added,
    Updated,
    Removed,
    Failed,
}

#[derive(Debug, Serialize)]
struct Change {
    action: Action,
    uuid: Uuid,
    name: String,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Accessory")]
    name: String,
    #[tabled(rename = "UUID")]
    uuid: String,
}

pub async fn handle(args: SyncArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let active = ActiveProfile::resolve(global)?;
    let file = JsonFileStore::open(active.cache_path(args.cache))?;
    let store: Arc<dyn AccessoryStore> = if args.dry_run {
        Arc::new(MemoryStore::with_cached(file.cached()?))
    } else {
        Arc::new(file)
    };

    let platform = Platform::connect(active.platform_config()?, store)?;
    platform.restore()?;
    let before: HashMap<Uuid, String> = platform
        .accessories()
        .into_iter()
        .map(|a| (a.uuid, a.display_name))
        .collect();

    let report = platform.discover().await?;

    let after: HashMap<Uuid, String> = platform
        .accessories()
        .into_iter()
        .map(|a| (a.uuid, a.display_name))
        .collect();
    let name_of = |uuid: &Uuid| {
        after
            .get(uuid)
            .or_else(|| before.get(uuid))
            .cloned()
            .unwrap_or_default()
    };

    let changes: Vec<Change> = [
        (Action::Added, &report.added),
        (Action::Updated, &report.updated),
        (Action::Removed, &report.removed),
        (Action::Failed, &report.failed),
    ]
    .into_iter()
    .flat_map(|(action, uuids)| uuids.iter().map(move |uuid| (action, *uuid)))
    .map(|(action, uuid)| Change {
        action,
        name: name_of(&uuid),
        uuid,
    })
    .collect();

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &changes,
        |c| ChangeRow {
            action: match c.action {
                Action::Added => output::added("added", color),
                Action::Updated => output::muted("updated", color),
                Action::Removed => output::removed("removed", color),
                Action::Failed => output::removed("failed", color),
            },
            name: c.name.clone(),
            uuid: c.uuid.to_string(),
        },
        |c| c.uuid.to_string(),
    )?;
    output::print_output(&out, global.quiet);

    if !global.quiet {
        let suffix = if args.dry_run { " (dry run)" } else { "" };
        eprintln!(
            "{} added, {} updated, {} removed, {} skipped, {} failed{suffix}",
            report.added.len(),
            report.updated.len(),
            report.removed.len(),
            report.skipped,
            report.failed.len(),
        );
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::Store {
            message: format!(
                "{} accessories could not be written to the cache",
                report.failed.len()
            ),
        })
    }
}
