// ── Device record ──
//
// One entry of the device table. Identity and descriptive fields are fixed
// when the device is first observed; runtime state is overwritten in place
// by every poll, and the visibility fields are recomputed each time.

use chrono::{DateTime, Utc};
use crestron_api::RawRecord;
use serde::{Deserialize, Serialize};
use strum::Display;

use super::key::{DeviceKey, EntityKey, Namespace, PlatformType};

pub const PRESENCE_VACANT: &str = "Vacant";
pub const PRESENCE_UNAVAILABLE: &str = "Unavailable";
pub const DOOR_STATUS_OPEN: &str = "Open";
pub const DOOR_STATUS_CLOSED: &str = "Closed";

/// Connection state reported by the hub.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Connection {
    #[default]
    #[strum(serialize = "online")]
    #[serde(rename = "online")]
    Online,
    #[strum(serialize = "offline")]
    #[serde(rename = "offline")]
    Offline,
    /// Scenes have no physical connection.
    #[strum(serialize = "n/a")]
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl Connection {
    /// Interpret a hub `connectionStatus` value. Anything but "offline" is online.
    pub fn from_hub(status: &str) -> Self {
        if status.eq_ignore_ascii_case("offline") {
            Self::Offline
        } else {
            Self::Online
        }
    }
}

/// Availability as seen by consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Available,
    Unavailable,
    /// Hidden devices have no state at all.
    NoState,
}

/// Kind-specific runtime payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reading {
    /// Lights, shades, scenes, thermostats and unrecognised sensors.
    #[default]
    Generic,
    Occupancy {
        presence: String,
    },
    Door {
        door_status: String,
        battery_level: String,
    },
    Photo {
        value: u32,
        unit: String,
    },
}

/// Volatile fields compared between polls to detect changes.
pub type ChangeFields = (
    bool,
    u32,
    u32,
    Connection,
    Option<String>,
    Option<String>,
);

/// A physical or logical hub device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    // Identity
    pub id: u32,
    pub namespace: Namespace,

    // Descriptive, fixed at discovery
    pub room: String,
    pub room_id: Option<u32>,
    pub name: String,
    pub hub_type: String,
    pub hub_subtype: String,
    pub discovered_at: DateTime<Utc>,

    // Runtime state
    pub status: bool,
    /// 0..=65535. Photo sensors also mirror their reading here.
    pub level: u32,
    /// 0..=65535, shades only.
    pub position: u32,
    pub connection: Connection,
    pub reading: Reading,
    /// Last payload from the hub, verbatim.
    pub raw: RawRecord,

    // Classification
    pub hidden: bool,
    pub availability: Availability,
    pub reason: String,
}

impl Device {
    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(self.namespace, self.id)
    }

    /// Platform type, or `None` when the hub type is not one we expose.
    pub fn platform_type(&self) -> Option<PlatformType> {
        PlatformType::from_hub(&self.hub_type, &self.hub_subtype)
    }

    pub fn entity_key(&self) -> Option<EntityKey> {
        self.platform_type().map(|p| EntityKey::new(p, self.id))
    }

    /// Room-qualified name. The room prefix is dropped when the name already
    /// starts with it, so "Kitchen Light" in "Kitchen" stays "Kitchen Light".
    pub fn full_name(&self) -> String {
        if !self.room.is_empty() && starts_with_ignore_case(&self.name, &self.room) {
            return self.name.trim().to_owned();
        }
        format!("{} {}", self.room, self.name).trim().to_owned()
    }

    pub fn is_available(&self) -> bool {
        self.connection != Connection::Offline
    }

    pub fn is_scene(&self) -> bool {
        self.platform_type() == Some(PlatformType::Scene)
    }

    pub fn presence(&self) -> Option<&str> {
        match &self.reading {
            Reading::Occupancy { presence } => Some(presence),
            _ => None,
        }
    }

    pub fn door_status(&self) -> Option<&str> {
        match &self.reading {
            Reading::Door { door_status, .. } => Some(door_status),
            _ => None,
        }
    }

    pub fn battery_level(&self) -> Option<&str> {
        match &self.reading {
            Reading::Door { battery_level, .. } => Some(battery_level),
            _ => None,
        }
    }

    pub(crate) fn change_fields(&self) -> ChangeFields {
        (
            self.status,
            self.level,
            self.position,
            self.connection,
            self.presence().map(str::to_owned),
            self.door_status().map(str::to_owned),
        )
    }
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack.to_lowercase().starts_with(&prefix.to_lowercase())
}
