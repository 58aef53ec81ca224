// ── Entity kinds ──
//
// Which entity a device becomes is a pure function of its platform type
// and hub subtype. Each kind reads its state from the device through the
// small functions below; rendering is left to the consumer.

pub mod thermostat;

use crestron_api::MAX_LEVEL;
use serde::Serialize;
use strum::Display;

use crate::model::{
    DOOR_STATUS_OPEN, Device, PRESENCE_UNAVAILABLE, PRESENCE_VACANT, PlatformType, Reading,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// On/off switch load.
    Light,
    Dimmer,
    Shade,
    Scene,
    Occupancy,
    Door,
    Photo,
    Thermostat,
}

impl EntityKind {
    /// Entity kind for a device, or `None` for devices no entity represents
    /// (unmapped types, sensors of unknown subtype).
    pub fn for_device(device: &Device) -> Option<Self> {
        let kind = match device.platform_type()? {
            PlatformType::Light if device.hub_subtype == "Dimmer" => Self::Dimmer,
            PlatformType::Light => Self::Light,
            PlatformType::Shade => Self::Shade,
            PlatformType::Scene => Self::Scene,
            PlatformType::BinarySensor => match device.reading {
                Reading::Occupancy { .. } => Self::Occupancy,
                Reading::Door { .. } => Self::Door,
                _ => return None,
            },
            PlatformType::Sensor => match device.reading {
                Reading::Photo { .. } => Self::Photo,
                _ => return None,
            },
            PlatformType::Thermostat => Self::Thermostat,
        };
        Some(kind)
    }

    pub fn platform(self) -> PlatformType {
        match self {
            Self::Light | Self::Dimmer => PlatformType::Light,
            Self::Shade => PlatformType::Shade,
            Self::Scene => PlatformType::Scene,
            Self::Occupancy | Self::Door => PlatformType::BinarySensor,
            Self::Photo => PlatformType::Sensor,
            Self::Thermostat => PlatformType::Thermostat,
        }
    }

    /// Kinds that send commands and so use the optimistic cooldown.
    pub fn is_controllable(self) -> bool {
        matches!(
            self,
            Self::Light | Self::Dimmer | Self::Shade | Self::Thermostat
        )
    }
}

// ── Level conversion ────────────────────────────────────────────────

/// Hub level (0..=65535) to a rounded percentage.
pub fn to_percentage(level: u32) -> u8 {
    let max = u64::from(MAX_LEVEL);
    let level = u64::from(level.min(MAX_LEVEL));
    u8::try_from((level * 100 + max / 2) / max).unwrap_or(100)
}

/// Percentage (clamped to 100) to the nearest hub level.
pub fn from_percentage(percent: u8) -> u32 {
    let percent = u64::from(percent.min(100));
    u32::try_from((percent * u64::from(MAX_LEVEL) + 50) / 100).unwrap_or(MAX_LEVEL)
}

// ── Lights ──────────────────────────────────────────────────────────

pub fn light_is_on(device: &Device) -> bool {
    device.level > 0
}

/// Brightness on a 0..=255 scale, via the rounded percentage.
pub fn brightness(device: &Device) -> u8 {
    u8::try_from(u32::from(to_percentage(device.level)) * 255 / 100).unwrap_or(u8::MAX)
}

/// Hub level for a 0..=255 brightness.
pub fn brightness_to_level(brightness: u8) -> u32 {
    // 65535 / 255 == 257 exactly
    u32::from(brightness) * 257
}

// ── Shades ──────────────────────────────────────────────────────────

/// Shade position percent; 0 is closed, 100 fully open.
pub fn shade_position(device: &Device) -> u8 {
    to_percentage(device.position)
}

pub fn shade_is_closed(device: &Device) -> bool {
    shade_position(device) == 0
}

// ── Sensors ─────────────────────────────────────────────────────────

pub fn occupancy_detected(device: &Device) -> bool {
    device
        .presence()
        .is_some_and(|p| p != PRESENCE_VACANT && p != PRESENCE_UNAVAILABLE)
}

pub fn door_is_open(device: &Device) -> bool {
    device.door_status() == Some(DOOR_STATUS_OPEN)
}

/// Illuminance in lux: the photo reading, else the mirrored level.
pub fn illuminance(device: &Device) -> u32 {
    match device.reading {
        Reading::Photo { value, .. } if value > 0 => value,
        _ => device.level,
    }
}
