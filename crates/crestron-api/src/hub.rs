// The contract the reconciliation core depends on.
//
// `HubClient` implements it over HTTP; tests implement it in memory.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;
use crate::models::{RawRecord, Room};

/// Read and command surface of a Crestron Home processor.
///
/// Collection calls return raw records: each one has at least an `id`
/// when well formed, but callers must tolerate records that do not.
#[async_trait]
pub trait HubApi: Send + Sync {
    /// General devices (lights, shades, scenes, ...).
    ///
    /// `enabled_types` are platform type tags (`"light"`, `"scene"`, ...).
    /// Classification against `ignored_patterns` happens in the caller, so
    /// implementations return hidden devices too.
    async fn get_devices(
        &self,
        enabled_types: &[String],
        ignored_patterns: &[String],
    ) -> Result<Vec<RawRecord>, Error>;

    /// Occupancy, door and photo sensors.
    async fn get_sensors(&self, ignored_patterns: &[String]) -> Result<Vec<RawRecord>, Error>;

    /// Thermostats, with their full opaque payload.
    async fn get_thermostats(&self) -> Result<Vec<RawRecord>, Error>;

    /// Cached room list. Synchronous: no network access.
    fn rooms(&self) -> Vec<Room>;

    /// Set a light load level (0..=65535) with an optional fade time in seconds.
    async fn set_light_state(&self, id: u32, level: u32, transition_secs: u32)
    -> Result<(), Error>;

    /// Move a shade to a position (0..=65535).
    async fn set_shade_position(&self, id: u32, position: u32) -> Result<(), Error>;

    /// Fetch the live state of one shade.
    async fn get_shade_state(&self, id: u32) -> Result<RawRecord, Error>;

    async fn recall_scene(&self, id: u32) -> Result<(), Error>;

    async fn set_thermostat_mode(&self, id: u32, mode: &str) -> Result<(), Error>;

    /// `temperature` is in the hub's deci-degree units.
    async fn set_thermostat_setpoint(
        &self,
        id: u32,
        kind: &str,
        temperature: i32,
    ) -> Result<(), Error>;

    async fn set_thermostat_fan_mode(&self, id: u32, mode: &str) -> Result<(), Error>;
}

/// Read a numeric `id` from a raw record.
///
/// Accepts JSON numbers and numeric strings; anything else is `None`.
pub fn record_id(record: &RawRecord) -> Option<u32> {
    match record.get("id")? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => RawRecord::new(),
        }
    }

    #[test]
    fn record_id_accepts_numbers_and_numeric_strings() {
        assert_eq!(record_id(&record(json!({ "id": 42 }))), Some(42));
        assert_eq!(record_id(&record(json!({ "id": "17" }))), Some(17));
        assert_eq!(record_id(&record(json!({ "id": null }))), None);
        assert_eq!(record_id(&record(json!({ "id": "abc" }))), None);
        assert_eq!(record_id(&record(json!({ "id": -3 }))), None);
        assert_eq!(record_id(&record(json!({ "name": "x" }))), None);
    }
}
