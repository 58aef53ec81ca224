//! Live view: keep the coordinator polling and print what changes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use crestron_core::{
    Coordinator, Device, DeviceKey, EntityRegistry, EntityTracker, HubConfig, Snapshot,
};
use tracing::{info, warn};

use crate::cli::GlobalOpts;
use crate::error::CliError;

use super::devices::state_summary;

/// Registry that only logs; a terminal has nowhere to hide entities.
struct LogRegistry;

impl EntityRegistry for LogRegistry {
    fn mark_hidden(&self, unique_id: &str) {
        info!(entity = unique_id, "hidden by default");
    }
}

pub async fn handle(config: &HubConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let coordinator = Coordinator::connect(config).await?;

    let entities = EntityTracker::new(&coordinator, Arc::new(LogRegistry));

    let snapshot = coordinator.snapshot();
    if !global.quiet {
        println!(
            "Watching {} ({} devices, {} entities, every {}s). Ctrl-C to stop.",
            config.host,
            snapshot.len(),
            entities.len(),
            coordinator.interval().as_secs()
        );
    }

    let mut updates = coordinator.watch_snapshot();
    let mut refresh = coordinator.refresh_state();
    let mut healthy = coordinator.last_update_success();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                let changes = coordinator.last_changes().await;
                if !global.quiet {
                    print_changes(&snapshot, &changes);
                }
            }
            changed = refresh.changed() => {
                if changed.is_err() {
                    break;
                }
                refresh.borrow_and_update();
                let ok = coordinator.last_update_success();
                if ok != healthy {
                    healthy = ok;
                    match coordinator.last_error() {
                        Some(err) if !ok => warn!(error = %err, "hub unreachable"),
                        _ => info!("hub reachable again"),
                    }
                }
            }
        }
    }

    coordinator.shutdown().await;
    Ok(())
}

fn print_changes(snapshot: &Snapshot, changes: &crestron_core::ChangeSet) {
    let by_key: HashMap<DeviceKey, &Arc<Device>> = snapshot
        .iter()
        .flat_map(|(_, devices)| devices.values())
        .map(|d| (d.key(), d))
        .collect();
    let now = Local::now().format("%H:%M:%S");

    let describe = |key: &DeviceKey| {
        by_key.get(key).map_or_else(
            || key.to_string(),
            |d| format!("{} [{}]: {}", d.full_name(), key, state_summary(d)),
        )
    };

    for key in &changes.discovered {
        println!("{now} + {}", describe(key));
    }
    for key in &changes.changed {
        println!("{now} ~ {}", describe(key));
    }
    for removed in &changes.removed {
        println!("{now} - {} [{}]", removed.name, removed.key);
    }
}
