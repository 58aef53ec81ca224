// ── Device identity ──
//
// Numeric ids are only unique within one hub collection, so every device
// is keyed by `{namespace}:{id}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Hub collection a device was observed in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Device,
    Sensor,
    Thermostat,
}

/// Composite device key, rendered as `{namespace}:{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey {
    pub namespace: Namespace,
    pub id: u32,
}

impl DeviceKey {
    pub fn new(namespace: Namespace, id: u32) -> Self {
        Self { namespace, id }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.id)
    }
}

impl FromStr for DeviceKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ns, id) = s
            .split_once(':')
            .ok_or_else(|| format!("expected namespace:id, got {s:?}"))?;
        let namespace = ns
            .parse()
            .map_err(|_| format!("unknown namespace {ns:?}"))?;
        let id = id.parse().map_err(|_| format!("invalid id {id:?}"))?;
        Ok(Self { namespace, id })
    }
}

impl Serialize for DeviceKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Platform type a device is exposed as.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum PlatformType {
    Light,
    Shade,
    Scene,
    BinarySensor,
    Sensor,
    Thermostat,
}

impl PlatformType {
    /// Map a hub subtype / type string through the static table.
    fn from_table(tag: &str) -> Option<Self> {
        match tag {
            "Dimmer" | "Switch" => Some(Self::Light),
            "Shade" => Some(Self::Shade),
            "Scene" => Some(Self::Scene),
            "OccupancySensor" | "DoorSensor" => Some(Self::BinarySensor),
            "PhotoSensor" => Some(Self::Sensor),
            "Thermostat" => Some(Self::Thermostat),
            _ => None,
        }
    }

    /// Resolve the platform type for a hub `type` / `subType` pair.
    ///
    /// The subtype wins when both are in the table; `"Scene"` in either
    /// position is always a scene.
    pub fn from_hub(hub_type: &str, hub_subtype: &str) -> Option<Self> {
        if hub_type == "Scene" || hub_subtype == "Scene" {
            return Some(Self::Scene);
        }
        Self::from_table(hub_subtype).or_else(|| Self::from_table(hub_type))
    }
}

/// Key of one entity in the published snapshot: platform plus numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub platform: PlatformType,
    pub id: u32,
}

impl EntityKey {
    pub fn new(platform: PlatformType, id: u32) -> Self {
        Self { platform, id }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.id)
    }
}
