// ── Entity tracker ──
//
// Owns one `Entity` per representable device and keeps the set growing as
// later polls discover new devices. Entities are never dropped here: a
// device missing from a poll keeps its entity and last known state.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info};

use super::{Entity, EntityRegistry};
use crate::coordinator::{Coordinator, ListenerHandle};
use crate::model::EntityKey;

struct Tracked {
    entity: Arc<Entity>,
    _listener: ListenerHandle,
}

struct TrackerInner {
    coordinator: Coordinator,
    registry: Arc<dyn EntityRegistry>,
    entities: Mutex<BTreeMap<EntityKey, Tracked>>,
}

/// Adds an entity for every device the coordinator publishes, including
/// devices that first appear after setup.
pub struct EntityTracker {
    inner: Arc<TrackerInner>,
    _listener: ListenerHandle,
}

impl EntityTracker {
    /// Build entities for the current snapshot and follow later publishes
    /// until the tracker is dropped.
    pub fn new(coordinator: &Coordinator, registry: Arc<dyn EntityRegistry>) -> Self {
        let inner = Arc::new(TrackerInner {
            coordinator: coordinator.clone(),
            registry,
            entities: Mutex::new(BTreeMap::new()),
        });
        let added = inner.sync();
        debug!(entities = added.len(), "initial entities added");

        let weak: Weak<TrackerInner> = Arc::downgrade(&inner);
        let listener = coordinator.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                for entity in inner.sync() {
                    info!(entity = %entity.unique_id(), name = %entity.name(), "entity added");
                }
            }
        });

        Self {
            inner,
            _listener: listener,
        }
    }

    pub fn get(&self, key: &EntityKey) -> Option<Arc<Entity>> {
        self.inner.lock().get(key).map(|t| Arc::clone(&t.entity))
    }

    /// All tracked entities, ordered by key.
    pub fn entities(&self) -> Vec<Arc<Entity>> {
        self.inner
            .lock()
            .values()
            .map(|t| Arc::clone(&t.entity))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl TrackerInner {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<EntityKey, Tracked>> {
        self.entities.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add entities for snapshot devices not seen before; returns the new ones.
    fn sync(&self) -> Vec<Arc<Entity>> {
        let snapshot = self.coordinator.snapshot();
        let mut entities = self.lock();
        let mut added = Vec::new();

        for device in snapshot.iter().flat_map(|(_, devices)| devices.values()) {
            let Some(key) = device.entity_key() else {
                continue;
            };
            if entities.contains_key(&key) {
                continue;
            }
            let Some(entity) = Entity::new(self.coordinator.clone(), Arc::clone(device)) else {
                continue;
            };
            let entity = Arc::new(entity);
            entity.added(self.registry.as_ref());
            let listener = entity.attach();
            entities.insert(
                key,
                Tracked {
                    entity: Arc::clone(&entity),
                    _listener: listener,
                },
            );
            added.push(entity);
        }

        added
    }
}

impl std::fmt::Debug for EntityTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityTracker")
            .field("entities", &self.len())
            .finish_non_exhaustive()
    }
}
