// ── Published snapshot ──
//
// Platform type → id → device, rebuilt in full after every successful poll.
// Every platform is present even when it has no devices.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use strum::IntoEnumIterator;

use super::device::Device;
use super::key::PlatformType;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    by_type: BTreeMap<PlatformType, BTreeMap<u32, Arc<Device>>>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            by_type: PlatformType::iter().map(|p| (p, BTreeMap::new())).collect(),
        }
    }
}

impl Snapshot {
    /// Bucket devices by their platform type. Unmapped devices are left out.
    pub fn group<'a>(devices: impl IntoIterator<Item = &'a Device>) -> Self {
        let mut snapshot = Self::default();
        for device in devices {
            let Some(platform) = device.platform_type() else {
                continue;
            };
            snapshot
                .by_type
                .entry(platform)
                .or_default()
                .insert(device.id, Arc::new(device.clone()));
        }
        snapshot
    }

    pub fn get(&self, platform: PlatformType, id: u32) -> Option<&Arc<Device>> {
        self.by_type.get(&platform)?.get(&id)
    }

    /// Devices of one platform type, ordered by id.
    pub fn platform(&self, platform: PlatformType) -> impl Iterator<Item = &Arc<Device>> {
        self.by_type.get(&platform).into_iter().flat_map(BTreeMap::values)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlatformType, &BTreeMap<u32, Arc<Device>>)> {
        self.by_type.iter().map(|(p, devices)| (*p, devices))
    }

    pub fn count(&self, platform: PlatformType) -> usize {
        self.by_type.get(&platform).map_or(0, BTreeMap::len)
    }

    pub fn len(&self) -> usize {
        self.by_type.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
