// Wire types for the Crestron Home REST API.
//
// Collection payloads are kept as raw JSON maps: the hub's device records
// vary by subtype and firmware, and the reconciliation layer reads them
// field by field. Only the envelopes and command bodies are typed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw record from `/devices`, `/sensors` or `/thermostats`.
pub type RawRecord = Map<String, Value>;

/// Level and position scale used by the hub (0..=65535).
pub const MAX_LEVEL: u32 = 65_535;

/// A room as reported by `/rooms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

/// `GET /login` response.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub authkey: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoomsEnvelope {
    #[serde(default)]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DevicesEnvelope {
    #[serde(default)]
    pub devices: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScenesEnvelope {
    #[serde(default)]
    pub scenes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SensorsEnvelope {
    #[serde(default)]
    pub sensors: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ThermostatsEnvelope {
    #[serde(default)]
    pub thermostats: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShadesEnvelope {
    #[serde(default)]
    pub shades: Vec<Value>,
}

// ── Command bodies ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct LightState {
    pub id: u32,
    pub level: u32,
    pub time: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct LightsBody {
    pub lights: Vec<LightState>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ShadeState {
    pub id: u32,
    pub position: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ShadesBody {
    pub shades: Vec<ShadeState>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ThermostatMode<'a> {
    pub id: u32,
    pub mode: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ThermostatModesBody<'a> {
    pub thermostats: Vec<ThermostatMode<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetPoint<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub temperature: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetPointBody<'a> {
    pub id: u32,
    pub setpoints: Vec<SetPoint<'a>>,
}

/// Filter raw JSON values down to object records, dropping anything else.
pub(crate) fn into_records(values: Vec<Value>) -> Vec<RawRecord> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            other => {
                tracing::warn!(value = %other, "skipping non-object record");
                None
            }
        })
        .collect()
}
