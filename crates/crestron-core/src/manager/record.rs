// ── Raw record parsing ──
//
// Turns one raw hub record into an `Observation`: the fields the device
// table cares about, read leniently (numbers may arrive as strings) but
// rejecting shapes that make no sense (objects where a number belongs).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use crestron_api::{RawRecord, record_id};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::model::{
    Availability, Connection, DOOR_STATUS_CLOSED, DOOR_STATUS_OPEN, Device, DeviceKey, Namespace,
    PRESENCE_UNAVAILABLE, PRESENCE_VACANT, PlatformType, Reading,
};

pub(crate) type RoomLookup = HashMap<u32, String>;

const OCCUPANCY_SENSOR: &str = "OccupancySensor";
const DOOR_SENSOR: &str = "DoorSensor";
const PHOTO_SENSOR: &str = "PhotoSensor";
const THERMOSTAT: &str = "Thermostat";

#[derive(Debug, Error)]
pub(crate) enum RecordError {
    #[error("record has no usable id")]
    MissingId,

    #[error("record {id}: field {field:?} has unexpected value {value}")]
    BadField {
        id: u32,
        field: &'static str,
        value: Value,
    },
}

impl RecordError {
    /// Hub id of the record, when it got far enough to have one.
    pub fn id(&self) -> Option<u32> {
        match self {
            Self::MissingId => None,
            Self::BadField { id, .. } => Some(*id),
        }
    }
}

/// Parsed view of one raw record.
#[derive(Debug)]
pub(crate) struct Observation {
    pub key: DeviceKey,
    room: String,
    room_id: Option<u32>,
    name: String,
    hub_type: String,
    hub_subtype: String,
    status: bool,
    level: u32,
    position: u32,
    connection: Connection,
    reading: Reading,
    raw: RawRecord,
}

impl Observation {
    pub fn parse(
        namespace: Namespace,
        raw: RawRecord,
        rooms: &RoomLookup,
    ) -> Result<Self, RecordError> {
        let id = record_id(&raw).ok_or(RecordError::MissingId)?;
        let fields = Fields { raw: &raw, id };
        let parsed = match namespace {
            Namespace::Device => Parsed::device(&fields, rooms)?,
            Namespace::Sensor => Parsed::sensor(&fields, rooms)?,
            Namespace::Thermostat => Parsed::thermostat(&fields, rooms)?,
        };
        Ok(Self {
            key: DeviceKey::new(namespace, id),
            room: parsed.room,
            room_id: parsed.room_id,
            name: parsed.name,
            hub_type: parsed.hub_type,
            hub_subtype: parsed.hub_subtype,
            status: parsed.status,
            level: parsed.level,
            position: parsed.position,
            connection: parsed.connection,
            reading: parsed.reading,
            raw,
        })
    }

    /// Overwrite the runtime state of an existing device.
    pub fn apply_to(self, device: &mut Device) {
        device.status = self.status;
        device.level = self.level;
        device.position = self.position;
        device.connection = self.connection;
        device.reading = self.reading;
        device.raw = self.raw;
    }

    /// Build a new device; classification is left at its defaults.
    pub fn into_device(self, discovered_at: DateTime<Utc>) -> Device {
        Device {
            id: self.key.id,
            namespace: self.key.namespace,
            room: self.room,
            room_id: self.room_id,
            name: self.name,
            hub_type: self.hub_type,
            hub_subtype: self.hub_subtype,
            discovered_at,
            status: self.status,
            level: self.level,
            position: self.position,
            connection: self.connection,
            reading: self.reading,
            raw: self.raw,
            hidden: false,
            availability: Availability::Available,
            reason: String::new(),
        }
    }
}

/// Everything but the raw payload, so parsing can borrow it.
struct Parsed {
    room: String,
    room_id: Option<u32>,
    name: String,
    hub_type: String,
    hub_subtype: String,
    status: bool,
    level: u32,
    position: u32,
    connection: Connection,
    reading: Reading,
}

impl Parsed {
    fn device(f: &Fields<'_>, rooms: &RoomLookup) -> Result<Self, RecordError> {
        let ty = f.text("type")?;
        let subtype = f.text("subType")?;
        let hub_type = ty.clone().or_else(|| subtype.clone()).unwrap_or_default();
        let hub_subtype = subtype.or(ty).unwrap_or_default();
        let platform = PlatformType::from_hub(&hub_type, &hub_subtype);

        let connection = if platform == Some(PlatformType::Scene) {
            Connection::NotApplicable
        } else {
            f.connection()?
        };
        let position = if platform == Some(PlatformType::Shade) {
            f.number("position")?.unwrap_or(0)
        } else {
            0
        };

        let room_id = f.number("roomId")?;
        let room = match f.text("roomName")? {
            Some(name) => name,
            None => room_name(rooms, room_id),
        };

        Ok(Self {
            room,
            room_id,
            name: f.text("name")?.unwrap_or_default(),
            hub_type,
            hub_subtype,
            status: f.flag("status")?,
            level: f.number("level")?.unwrap_or(0),
            position,
            connection,
            reading: Reading::Generic,
        })
    }

    fn sensor(f: &Fields<'_>, rooms: &RoomLookup) -> Result<Self, RecordError> {
        let subtype = match f.text("subType")? {
            Some(s) => s,
            None => f.text("type")?.unwrap_or_default(),
        };
        let room_id = f.number("roomId")?;

        let mut status = false;
        let mut level = 0;
        let reading = match subtype.as_str() {
            OCCUPANCY_SENSOR => {
                let presence = f
                    .text("presence")?
                    .unwrap_or_else(|| PRESENCE_UNAVAILABLE.to_owned());
                status = presence != PRESENCE_VACANT && presence != PRESENCE_UNAVAILABLE;
                Reading::Occupancy { presence }
            }
            DOOR_SENSOR => {
                let door_status = f
                    .text("door_status")?
                    .unwrap_or_else(|| DOOR_STATUS_CLOSED.to_owned());
                status = door_status == DOOR_STATUS_OPEN;
                Reading::Door {
                    door_status,
                    battery_level: f
                        .text("battery_level")?
                        .unwrap_or_else(|| "Normal".to_owned()),
                }
            }
            PHOTO_SENSOR => {
                let value = f.number("level")?.unwrap_or(0);
                level = value;
                Reading::Photo {
                    value,
                    unit: f.text("unit")?.unwrap_or_default(),
                }
            }
            _ => Reading::Generic,
        };

        Ok(Self {
            room: room_name(rooms, room_id),
            room_id,
            name: f.text("name")?.unwrap_or_default(),
            hub_type: subtype.clone(),
            hub_subtype: subtype,
            status,
            level,
            position: 0,
            connection: f.connection()?,
            reading,
        })
    }

    fn thermostat(f: &Fields<'_>, rooms: &RoomLookup) -> Result<Self, RecordError> {
        let room_id = f.number("roomId")?;
        debug!(
            id = f.id,
            mode = ?f.raw.get("currentMode").or_else(|| f.raw.get("mode")),
            temperature = ?f.raw.get("currentTemperature"),
            "thermostat observed"
        );
        Ok(Self {
            room: room_name(rooms, room_id),
            room_id,
            name: f.text("name")?.unwrap_or_else(|| THERMOSTAT.to_owned()),
            hub_type: THERMOSTAT.to_owned(),
            hub_subtype: THERMOSTAT.to_owned(),
            status: false,
            level: 0,
            position: 0,
            connection: f.connection()?,
            reading: Reading::Generic,
        })
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
fn round_non_negative(f: f64) -> Option<u64> {
    (f.is_finite() && f >= 0.0).then(|| f.round() as u64)
}

fn room_name(rooms: &RoomLookup, room_id: Option<u32>) -> String {
    room_id
        .and_then(|id| rooms.get(&id))
        .cloned()
        .unwrap_or_default()
}

// ── Field readers ───────────────────────────────────────────────────

struct Fields<'a> {
    raw: &'a RawRecord,
    id: u32,
}

impl Fields<'_> {
    fn present(&self, field: &str) -> Option<&Value> {
        self.raw.get(field).filter(|v| !v.is_null())
    }

    fn bad(&self, field: &'static str, value: &Value) -> RecordError {
        RecordError::BadField {
            id: self.id,
            field,
            value: value.clone(),
        }
    }

    fn text(&self, field: &'static str) -> Result<Option<String>, RecordError> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
            Some(other) => Err(self.bad(field, other)),
        }
    }

    /// Non-negative integer; floats are rounded, numeric strings parsed.
    fn number(&self, field: &'static str) -> Result<Option<u32>, RecordError> {
        let Some(value) = self.present(field) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(round_non_negative)),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        parsed
            .map(|n| Some(u32::try_from(n).unwrap_or(u32::MAX)))
            .ok_or_else(|| self.bad(field, value))
    }

    fn flag(&self, field: &'static str) -> Result<bool, RecordError> {
        match self.present(field) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Number(n)) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
            Some(Value::String(s)) => Ok(matches!(
                s.to_ascii_lowercase().as_str(),
                "true" | "on" | "1"
            )),
            Some(other) => Err(self.bad(field, other)),
        }
    }

    fn connection(&self) -> Result<Connection, RecordError> {
        Ok(self
            .text("connectionStatus")?
            .map_or(Connection::Online, |s| Connection::from_hub(&s)))
    }
}
