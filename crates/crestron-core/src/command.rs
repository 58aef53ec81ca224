// ── Command API ──
//
// Every write against the hub flows through one `Command` enum. The
// coordinator routes each variant to the matching `HubApi` call; entity
// adapters build commands and decide whether to send them now or debounced.

use crestron_api::HubApi;
use serde_json::Value;
use tracing::debug;

use crate::error::CoreError;

/// All write operations against a Crestron Home hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ── Lights ───────────────────────────────────────────────────────
    SetLightLevel {
        id: u32,
        /// 0..=65535
        level: u32,
        transition_secs: u32,
    },

    // ── Shades ───────────────────────────────────────────────────────
    SetShadePosition {
        id: u32,
        /// 0..=65535
        position: u32,
    },
    /// Send the shade its live position so it stops moving. `fallback` is
    /// used when the live position cannot be read.
    StopShade { id: u32, fallback: u32 },

    // ── Scenes ───────────────────────────────────────────────────────
    RecallScene { id: u32 },

    // ── Thermostats ──────────────────────────────────────────────────
    SetThermostatMode { id: u32, mode: String },
    SetThermostatSetpoint {
        id: u32,
        /// Setpoint type, e.g. "Heat" or "Cool".
        kind: String,
        /// Deci-degrees.
        temperature: i32,
    },
    SetThermostatFanMode { id: u32, mode: String },
}

impl Command {
    /// Hub id of the device the command targets.
    pub fn id(&self) -> u32 {
        match self {
            Self::SetLightLevel { id, .. }
            | Self::SetShadePosition { id, .. }
            | Self::StopShade { id, .. }
            | Self::RecallScene { id }
            | Self::SetThermostatMode { id, .. }
            | Self::SetThermostatSetpoint { id, .. }
            | Self::SetThermostatFanMode { id, .. } => *id,
        }
    }

    /// Whether a refresh should follow so consumers see the effect.
    pub fn refreshes_after(&self) -> bool {
        matches!(self, Self::RecallScene { .. })
    }
}

/// Route a command to the corresponding hub call.
pub(crate) async fn route(api: &dyn HubApi, command: &Command) -> Result<(), CoreError> {
    debug!(?command, "sending command");
    match command {
        Command::SetLightLevel {
            id,
            level,
            transition_secs,
        } => api.set_light_state(*id, *level, *transition_secs).await?,
        Command::SetShadePosition { id, position } => {
            api.set_shade_position(*id, *position).await?;
        }
        Command::StopShade { id, fallback } => {
            let position = match api.get_shade_state(*id).await {
                Ok(state) => state
                    .get("position")
                    .and_then(Value::as_u64)
                    .and_then(|p| u32::try_from(p).ok())
                    .unwrap_or(*fallback),
                Err(e) => {
                    debug!(id, error = %e, "live shade position unavailable, using cached");
                    *fallback
                }
            };
            api.set_shade_position(*id, position).await?;
        }
        Command::RecallScene { id } => api.recall_scene(*id).await?,
        Command::SetThermostatMode { id, mode } => api.set_thermostat_mode(*id, mode).await?,
        Command::SetThermostatSetpoint {
            id,
            kind,
            temperature,
        } => api.set_thermostat_setpoint(*id, kind, *temperature).await?,
        Command::SetThermostatFanMode { id, mode } => {
            api.set_thermostat_fan_mode(*id, mode).await?;
        }
    }
    Ok(())
}
