//! Light, shade, scene and thermostat commands.
//!
//! Each invocation sends exactly one write, so commands go straight to the
//! coordinator rather than through a debounced entity.

use std::sync::Arc;

use crestron_core::kind::{self, thermostat};
use crestron_core::{
    Command as HubCommand, Coordinator, CoreError, Device, HubConfig, PlatformType,
};
use tracing::info;

use crate::cli::{
    GlobalOpts, LightAction, LightArgs, ShadeAction, ShadeArgs, ThermostatAction, ThermostatArgs,
};
use crate::error::CliError;
use crate::output;

use super::devices::state_summary;

fn lookup(
    coordinator: &Coordinator,
    platform: PlatformType,
    id: u32,
) -> Result<Arc<Device>, CoreError> {
    coordinator
        .snapshot()
        .get(platform, id)
        .cloned()
        .ok_or(CoreError::NotFound { platform, id })
}

/// Look the device up, then send whatever `build` makes of it.
async fn send(
    config: &HubConfig,
    platform: PlatformType,
    id: u32,
    build: impl FnOnce(&Device) -> Result<HubCommand, CoreError> + Send,
) -> Result<(), CliError> {
    Coordinator::oneshot(config, |coordinator| async move {
        let device = lookup(&coordinator, platform, id)?;
        let command = build(&device)?;
        info!(name = %device.full_name(), ?command, "sending");
        coordinator.execute(command).await
    })
    .await?;
    Ok(())
}

pub async fn light(args: LightArgs, config: &HubConfig) -> Result<(), CliError> {
    let id = args.id;
    let (level, transition_secs) = match args.action {
        LightAction::On {
            brightness,
            transition,
        } => (
            brightness.map_or(kind::from_percentage(100), kind::from_percentage),
            transition,
        ),
        LightAction::Off { transition } => (0, transition),
    };
    send(config, PlatformType::Light, id, |_| {
        Ok(HubCommand::SetLightLevel {
            id,
            level,
            transition_secs,
        })
    })
    .await
}

pub async fn shade(args: ShadeArgs, config: &HubConfig) -> Result<(), CliError> {
    let id = args.id;
    send(config, PlatformType::Shade, id, |device| {
        Ok(match args.action {
            ShadeAction::Open => HubCommand::SetShadePosition {
                id,
                position: kind::from_percentage(100),
            },
            ShadeAction::Close => HubCommand::SetShadePosition { id, position: 0 },
            ShadeAction::Position { percent } => HubCommand::SetShadePosition {
                id,
                position: kind::from_percentage(percent),
            },
            ShadeAction::Stop => HubCommand::StopShade {
                id,
                fallback: device.position,
            },
        })
    })
    .await
}

pub async fn scene(id: u32, config: &HubConfig) -> Result<(), CliError> {
    send(config, PlatformType::Scene, id, |_| {
        Ok(HubCommand::RecallScene { id })
    })
    .await
}

pub async fn thermostat(
    args: ThermostatArgs,
    config: &HubConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let id = args.id;
    match args.action {
        ThermostatAction::Show => {
            let device = Coordinator::oneshot(config, |coordinator| async move {
                lookup(&coordinator, PlatformType::Thermostat, id)
            })
            .await?;
            let out = output::render_single(&global.output, &device, |d| detail(d))?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
        ThermostatAction::Mode { mode } => {
            let mode: thermostat::HvacMode = mode.parse().map_err(|_| CliError::Validation {
                field: "mode".into(),
                reason: format!("expected off, heat, cool or auto, got '{mode}'"),
            })?;
            send(config, PlatformType::Thermostat, id, |_| {
                Ok(HubCommand::SetThermostatMode {
                    id,
                    mode: mode.as_hub().to_owned(),
                })
            })
            .await
        }
        ThermostatAction::Setpoint { temperature } => {
            send(config, PlatformType::Thermostat, id, |device| {
                let (min, max) = thermostat::temperature_bounds(&device.raw);
                if !(min..=max).contains(&temperature) {
                    return Err(CoreError::Config {
                        message: format!("temperature must be within {min}..={max}"),
                    });
                }
                Ok(HubCommand::SetThermostatSetpoint {
                    id,
                    kind: thermostat::setpoint_type(&device.raw),
                    temperature: thermostat::to_deci(temperature),
                })
            })
            .await
        }
        ThermostatAction::Fan { mode } => {
            send(config, PlatformType::Thermostat, id, |device| {
                let offered = thermostat::fan_modes(&device.raw);
                if !offered.is_empty() && !offered.iter().any(|m| m.eq_ignore_ascii_case(&mode)) {
                    return Err(CoreError::Config {
                        message: format!("fan mode must be one of {}", offered.join(", ")),
                    });
                }
                Ok(HubCommand::SetThermostatFanMode { id, mode })
            })
            .await
        }
    }
}

fn detail(d: &Device) -> String {
    let raw = &d.raw;
    let fmt = |t: Option<f64>| t.map_or_else(|| "-".into(), |t| format!("{t:.1}°"));
    let (min, max) = thermostat::temperature_bounds(raw);
    let modes: Vec<String> = thermostat::available_modes(raw)
        .iter()
        .map(|m| m.as_hub().to_owned())
        .collect();
    [
        format!("Name:     {}", d.full_name()),
        format!("State:    {}", state_summary(d)),
        format!("Mode:     {}", thermostat::mode_str(raw)),
        format!("Action:   {}", thermostat::hvac_action(raw)),
        format!("Current:  {}", fmt(thermostat::current_temperature(raw))),
        format!("Target:   {}", fmt(thermostat::target_temperature(raw))),
        format!("Range:    {min:.1}° to {max:.1}°"),
        format!("Modes:    {}", modes.join(", ")),
        format!("Fan:      {}", thermostat::fan_mode(raw).unwrap_or("-")),
        format!("Fans:     {}", thermostat::fan_modes(raw).join(", ")),
        format!("Online:   {}", d.is_available()),
    ]
    .join("\n")
}
