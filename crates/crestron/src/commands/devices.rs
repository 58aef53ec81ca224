//! Device table listing.

use std::sync::Arc;

use crestron_core::kind::{self, thermostat};
use crestron_core::{Coordinator, Device, EntityKind, HubConfig, PlatformType};
use tabled::Tabled;

use crate::cli::{DevicesArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Hub Type")]
    hub_type: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Connection")]
    connection: String,
    #[tabled(rename = "Availability")]
    availability: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl From<&Arc<Device>> for DeviceRow {
    fn from(d: &Arc<Device>) -> Self {
        Self {
            key: d
                .entity_key()
                .map_or_else(|| d.key().to_string(), |k| k.to_string()),
            name: d.full_name(),
            hub_type: if d.hub_type == d.hub_subtype || d.hub_subtype.is_empty() {
                d.hub_type.clone()
            } else {
                format!("{}/{}", d.hub_type, d.hub_subtype)
            },
            state: state_summary(d),
            connection: d.connection.to_string(),
            availability: d.availability.to_string(),
            reason: d.reason.clone(),
        }
    }
}

/// One-word-ish state for the table, per entity kind.
pub fn state_summary(d: &Device) -> String {
    match EntityKind::for_device(d) {
        Some(EntityKind::Light) => on_off(kind::light_is_on(d)).into(),
        Some(EntityKind::Dimmer) if kind::light_is_on(d) => {
            format!("on {}%", kind::to_percentage(d.level))
        }
        Some(EntityKind::Dimmer) => "off".into(),
        Some(EntityKind::Shade) => format!("{}% open", kind::shade_position(d)),
        Some(EntityKind::Occupancy) => d.presence().unwrap_or_default().to_owned(),
        Some(EntityKind::Door) => format!(
            "{} (battery {})",
            d.door_status().unwrap_or_default(),
            d.battery_level().unwrap_or_default()
        ),
        Some(EntityKind::Photo) => format!("{} lx", kind::illuminance(d)),
        Some(EntityKind::Thermostat) => {
            let fmt = |t: Option<f64>| t.map_or_else(|| "-".into(), |t| format!("{t:.1}°"));
            format!(
                "{} {} → {}",
                thermostat::mode_str(&d.raw),
                fmt(thermostat::current_temperature(&d.raw)),
                fmt(thermostat::target_temperature(&d.raw)),
            )
        }
        Some(EntityKind::Scene) | None => "-".into(),
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: &DevicesArgs,
    config: &HubConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let platform = args
        .r#type
        .as_deref()
        .map(|t| {
            t.parse::<PlatformType>().map_err(|_| CliError::Validation {
                field: "type".into(),
                reason: format!("unknown device type '{t}'"),
            })
        })
        .transpose()?;

    let snapshot = Coordinator::oneshot(config, |coordinator| async move {
        Ok(coordinator.snapshot())
    })
    .await?;

    let devices: Vec<Arc<Device>> = snapshot
        .iter()
        .filter(|(p, _)| platform.is_none_or(|want| want == *p))
        .flat_map(|(_, devices)| devices.values())
        .filter(|d| args.all || !d.hidden)
        .cloned()
        .collect();

    let out = output::render_list(&global.output, &devices, |d: &Arc<Device>| DeviceRow::from(d), |d| {
        d.entity_key()
            .map_or_else(|| d.key().to_string(), |k| k.to_string())
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
