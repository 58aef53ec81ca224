// ── Device manager ──
//
// Owns the device table. Each poll fetches the hub's collections
// concurrently, and only once every fetch has succeeded are the records
// merged into the table, classified, diffed against the previous poll and
// grouped into a fresh snapshot. A failed fetch leaves the table as it was.

pub mod classify;
pub(crate) mod record;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use crestron_api::{HubApi, RawRecord};
use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::{Level, debug, info, trace, warn};

use crate::config::PollSettings;
use crate::error::{Collection, CoreError};
use crate::model::{ChangeFields, Device, DeviceKey, Namespace, PlatformType, Snapshot};

pub use classify::{
    Classifier, IgnoreFilter, REASON_CATEGORY_FILTER, REASON_NAME_FILTER, REASON_OFFLINE, Verdict,
};
use record::{Observation, RoomLookup};

/// A device that disappeared from the hub between two polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedDevice {
    pub key: DeviceKey,
    /// Full name as last seen.
    pub name: String,
}

/// What the most recent poll changed in the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub discovered: Vec<DeviceKey>,
    pub changed: Vec<DeviceKey>,
    pub removed: Vec<RemovedDevice>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.discovered.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

pub struct DeviceManager {
    api: Arc<dyn HubApi>,
    settings: PollSettings,
    enabled_tags: Vec<String>,
    classifier: Classifier,
    devices: IndexMap<DeviceKey, Device>,
    last_poll: Option<DateTime<Utc>>,
    last_changes: ChangeSet,
}

impl DeviceManager {
    pub fn new(api: Arc<dyn HubApi>, settings: PollSettings) -> Self {
        Self {
            api,
            enabled_tags: settings.enabled_tags(),
            classifier: Classifier::new(&settings),
            settings,
            devices: IndexMap::new(),
            last_poll: None,
            last_changes: ChangeSet::default(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    pub fn get(&self, key: &DeviceKey) -> Option<&Device> {
        self.devices.get(key)
    }

    /// Devices in first-seen order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// When the last successful poll finished.
    pub fn last_poll(&self) -> Option<DateTime<Utc>> {
        self.last_poll
    }

    /// Diff produced by the last successful poll.
    pub fn last_changes(&self) -> &ChangeSet {
        &self.last_changes
    }

    /// Group the current table without polling.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::group(self.devices.values())
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// Fetch, merge, classify and group. On error the table is untouched.
    pub async fn poll(&mut self) -> Result<Snapshot, CoreError> {
        debug!(
            enabled = ?self.enabled_tags,
            ignored = ?self.settings.ignored_patterns,
            "polling hub"
        );

        let (devices, sensors, thermostats) = self
            .fetch()
            .await
            .inspect_err(|e| warn!(error = %e, "poll failed, keeping previous device table"))?;

        debug!(
            devices = devices.len(),
            sensors = sensors.len(),
            thermostats = thermostats.len(),
            "received hub collections"
        );

        let rooms: RoomLookup = self
            .api
            .rooms()
            .into_iter()
            .map(|r| (r.id, r.name))
            .collect();

        let previous: HashMap<DeviceKey, ChangeFields> = self
            .devices
            .iter()
            .map(|(key, device)| (*key, device.change_fields()))
            .collect();

        let now = Utc::now();
        let mut seen = HashSet::with_capacity(devices.len() + sensors.len() + thermostats.len());
        for (namespace, records) in [
            (Namespace::Device, devices),
            (Namespace::Sensor, sensors),
            (Namespace::Thermostat, thermostats),
        ] {
            for raw in records {
                match Observation::parse(namespace, raw, &rooms) {
                    Ok(observation) => {
                        if !seen.insert(observation.key) {
                            debug!(key = %observation.key, "duplicate record in one poll, keeping the last");
                        }
                        merge(&mut self.devices, &self.classifier, observation, now);
                    }
                    Err(e) => {
                        warn!(%namespace, error = %e, "skipping malformed record");
                        // A known id keeps its previous state rather than being dropped.
                        if let Some(id) = e.id() {
                            seen.insert(DeviceKey::new(namespace, id));
                        }
                    }
                }
            }
        }

        self.last_changes = self.reconcile(&previous, &seen);
        self.last_poll = Some(now);

        let snapshot = Snapshot::group(self.devices.values());
        for (platform, devices) in snapshot.iter() {
            debug!(%platform, count = devices.len(), "devices for platform");
        }
        self.log_table();

        Ok(snapshot)
    }

    async fn fetch(
        &self,
    ) -> Result<(Vec<RawRecord>, Vec<RawRecord>, Vec<RawRecord>), CoreError> {
        let api = self.api.as_ref();
        let ignored = &self.settings.ignored_patterns;
        let fetch_thermostats = self.settings.is_enabled(PlatformType::Thermostat);

        tokio::try_join!(
            async {
                api.get_devices(&self.enabled_tags, ignored)
                    .await
                    .map_err(|e| CoreError::fetch(Collection::Devices, e))
            },
            async {
                api.get_sensors(ignored)
                    .await
                    .map_err(|e| CoreError::fetch(Collection::Sensors, e))
            },
            async {
                if fetch_thermostats {
                    api.get_thermostats()
                        .await
                        .map_err(|e| CoreError::fetch(Collection::Thermostats, e))
                } else {
                    Ok(Vec::new())
                }
            },
        )
    }

    /// Drop devices missing from this poll and diff the rest.
    fn reconcile(
        &mut self,
        previous: &HashMap<DeviceKey, ChangeFields>,
        seen: &HashSet<DeviceKey>,
    ) -> ChangeSet {
        // The first poll discovers everything; only later polls are worth logging.
        let log_lifecycle = !previous.is_empty();
        let mut changes = ChangeSet::default();

        self.devices.retain(|key, device| {
            if seen.contains(key) {
                return true;
            }
            let name = device.full_name();
            if log_lifecycle {
                info!(%key, %name, "device removed");
            }
            changes.removed.push(RemovedDevice { key: *key, name });
            false
        });

        for (key, device) in &self.devices {
            match previous.get(key) {
                None => {
                    if log_lifecycle {
                        info!(%key, name = %device.full_name(), "new device discovered");
                    }
                    changes.discovered.push(*key);
                }
                Some(before) if *before != device.change_fields() => {
                    debug!(%key, name = %device.full_name(), "device changed");
                    changes.changed.push(*key);
                }
                Some(_) => {}
            }
        }

        changes
    }

    /// Room-grouped dump of the whole table at TRACE level.
    fn log_table(&self) {
        if !tracing::enabled!(Level::TRACE) {
            return;
        }

        let mut by_room: BTreeMap<&str, Vec<&Device>> = BTreeMap::new();
        for device in self.devices.values() {
            let room = if device.room.is_empty() {
                "Unknown Room"
            } else {
                device.room.as_str()
            };
            by_room.entry(room).or_default().push(device);
        }

        trace!(devices = self.devices.len(), last_poll = ?self.last_poll, "device table");
        for (room, mut devices) in by_room {
            devices.sort_by(|a, b| (&a.hub_type, &a.name).cmp(&(&b.hub_type, &b.name)));
            trace!(room, count = devices.len(), "room");
            for d in devices {
                trace!(
                    key = %d.key(),
                    name = %d.full_name(),
                    hub_type = %d.hub_type,
                    subtype = %d.hub_subtype,
                    status = d.status,
                    level = d.level,
                    position = d.position,
                    connection = %d.connection,
                    hidden = d.hidden,
                    availability = %d.availability,
                    reason = %d.reason,
                    reading = ?d.reading,
                    "device"
                );
            }
        }
    }
}

/// Update an existing device in place, or insert a new one.
fn merge(
    table: &mut IndexMap<DeviceKey, Device>,
    classifier: &Classifier,
    observation: Observation,
    now: DateTime<Utc>,
) {
    match table.entry(observation.key) {
        Entry::Occupied(mut entry) => {
            let device = entry.get_mut();
            observation.apply_to(device);
            classifier.apply(device);
        }
        Entry::Vacant(entry) => {
            let mut device = observation.into_device(now);
            classifier.apply(&mut device);
            entry.insert(device);
        }
    }
}
