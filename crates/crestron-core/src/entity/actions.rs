// Per-kind commands. Each one updates the local copy first, then talks
// to the hub; slider-style changes go through the debouncer.

use crestron_api::MAX_LEVEL;
use serde_json::Value;

use super::Entity;
use crate::command::Command;
use crate::error::CoreError;
use crate::kind::thermostat::{self, HvacMode};
use crate::kind::{self, EntityKind};
use crate::model::Device;

impl Entity {
    // ── Lights ───────────────────────────────────────────────────────

    /// Turn a light on, at `brightness` (0..=255) for dimmers.
    ///
    /// A dimmer brightness change is debounced; a plain "on" is sent at once.
    pub async fn turn_on(
        &self,
        brightness: Option<u8>,
        transition_secs: Option<u32>,
    ) -> Result<(), CoreError> {
        match self.kind {
            EntityKind::Light | EntityKind::Dimmer => {}
            EntityKind::Thermostat => return self.thermostat_on().await,
            _ => return Err(self.unsupported("turn_on")),
        }

        let level = match brightness {
            Some(b) if self.kind == EntityKind::Dimmer => kind::brightness_to_level(b),
            _ => MAX_LEVEL,
        };
        self.apply_optimistic(|d| set_level(d, level));

        let command = Command::SetLightLevel {
            id: self.key.id,
            level,
            transition_secs: transition_secs.unwrap_or(0),
        };
        if brightness.is_some() && self.kind == EntityKind::Dimmer {
            self.send_debounced(command);
            Ok(())
        } else {
            self.send(command).await
        }
    }

    pub async fn turn_off(&self, transition_secs: Option<u32>) -> Result<(), CoreError> {
        match self.kind {
            EntityKind::Light | EntityKind::Dimmer => {}
            EntityKind::Thermostat => return self.set_hvac_mode(HvacMode::Off).await,
            _ => return Err(self.unsupported("turn_off")),
        }
        self.apply_optimistic(|d| set_level(d, 0));
        self.send(Command::SetLightLevel {
            id: self.key.id,
            level: 0,
            transition_secs: transition_secs.unwrap_or(0),
        })
        .await
    }

    // ── Shades ───────────────────────────────────────────────────────

    pub async fn open_shade(&self) -> Result<(), CoreError> {
        self.move_shade_now(MAX_LEVEL, "open_shade").await
    }

    pub async fn close_shade(&self) -> Result<(), CoreError> {
        self.move_shade_now(0, "close_shade").await
    }

    /// Move a shade to `percent` open. Debounced.
    pub fn set_shade_position(&self, percent: u8) -> Result<(), CoreError> {
        self.require(EntityKind::Shade, "set_shade_position")?;
        let position = kind::from_percentage(percent);
        self.apply_optimistic(|d| d.position = position);
        self.send_debounced(Command::SetShadePosition {
            id: self.key.id,
            position,
        });
        Ok(())
    }

    /// Stop a moving shade where it is.
    pub async fn stop_shade(&self) -> Result<(), CoreError> {
        self.require(EntityKind::Shade, "stop_shade")?;
        self.debouncer.cancel();
        let fallback = self.device().position;
        self.send(Command::StopShade {
            id: self.key.id,
            fallback,
        })
        .await
    }

    async fn move_shade_now(&self, position: u32, operation: &'static str) -> Result<(), CoreError> {
        self.require(EntityKind::Shade, operation)?;
        self.debouncer.cancel();
        self.apply_optimistic(|d| d.position = position);
        self.send(Command::SetShadePosition {
            id: self.key.id,
            position,
        })
        .await
    }

    // ── Scenes ───────────────────────────────────────────────────────

    /// Recall a scene; the coordinator refreshes afterwards.
    pub async fn activate_scene(&self) -> Result<(), CoreError> {
        self.require(EntityKind::Scene, "activate_scene")?;
        self.send(Command::RecallScene { id: self.key.id }).await
    }

    // ── Thermostats ──────────────────────────────────────────────────

    pub async fn set_hvac_mode(&self, mode: HvacMode) -> Result<(), CoreError> {
        self.require(EntityKind::Thermostat, "set_hvac_mode")?;
        let hub_mode = mode.as_hub();
        self.apply_optimistic(|d| {
            d.raw.insert("currentMode".into(), Value::from(hub_mode));
        });
        self.send(Command::SetThermostatMode {
            id: self.key.id,
            mode: hub_mode.to_owned(),
        })
        .await
    }

    /// Set the target temperature (degrees) for the current mode's setpoint.
    pub async fn set_temperature(&self, degrees: f64) -> Result<(), CoreError> {
        self.require(EntityKind::Thermostat, "set_temperature")?;
        let kind = thermostat::setpoint_type(&self.device().raw);
        let temperature = thermostat::to_deci(degrees);
        self.apply_optimistic(|d| write_setpoint(d, &kind, temperature));
        self.send(Command::SetThermostatSetpoint {
            id: self.key.id,
            kind,
            temperature,
        })
        .await
    }

    pub async fn set_fan_mode(&self, mode: &str) -> Result<(), CoreError> {
        self.require(EntityKind::Thermostat, "set_fan_mode")?;
        self.apply_optimistic(|d| {
            d.raw.insert("currentFanMode".into(), Value::from(mode));
        });
        self.send(Command::SetThermostatFanMode {
            id: self.key.id,
            mode: mode.to_owned(),
        })
        .await
    }

    /// Switch to the first non-off mode the thermostat offers, else Auto.
    async fn thermostat_on(&self) -> Result<(), CoreError> {
        let mode = thermostat::available_modes(&self.device().raw)
            .into_iter()
            .find(|m| *m != HvacMode::Off)
            .unwrap_or(HvacMode::HeatCool);
        self.set_hvac_mode(mode).await
    }

    fn require(&self, kind: EntityKind, operation: &'static str) -> Result<(), CoreError> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(self.unsupported(operation))
        }
    }
}

fn set_level(device: &mut Device, level: u32) {
    device.level = level;
    device.status = level > 0;
}

/// Record a new setpoint in the raw payload so the thermostat helpers read it.
fn write_setpoint(device: &mut Device, kind: &str, temperature: i32) {
    if let Some(Value::Array(setpoints)) = device.raw.get_mut("currentSetPoint") {
        let existing = setpoints.iter_mut().find(|sp| {
            sp.get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.eq_ignore_ascii_case(kind))
        });
        match existing {
            Some(Value::Object(sp)) => {
                sp.insert("temperature".into(), Value::from(temperature));
            }
            _ => setpoints.push(serde_json::json!({ "type": kind, "temperature": temperature })),
        }
        return;
    }
    match device.raw.get_mut("setPoint") {
        Some(Value::Object(sp)) => {
            sp.insert("temperature".into(), Value::from(temperature));
        }
        _ => {
            device.raw.insert(
                "currentSetPoint".into(),
                serde_json::json!([{ "type": kind, "temperature": temperature }]),
            );
        }
    }
}
