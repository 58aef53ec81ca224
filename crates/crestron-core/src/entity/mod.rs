// ── Entity command adapter ──
//
// An `Entity` is the consumer-facing view of one device: it reads its state
// from the coordinator's snapshot, applies commands optimistically to a
// local copy, and collapses slider bursts into one network call. Consumers
// observe state through a `watch` channel.

mod actions;
mod debounce;
mod tracker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::command::Command;
use crate::coordinator::{Coordinator, ListenerHandle};
use crate::error::CoreError;
use crate::kind::EntityKind;
use crate::model::{Device, EntityKey, PlatformType};

pub use debounce::DEBOUNCE_DELAY;
use debounce::Debouncer;
pub use tracker::EntityTracker;

/// Host-side registry an entity reports itself to when added.
pub trait EntityRegistry: Send + Sync {
    /// Mark the entity with `unique_id` as hidden by the integration.
    fn mark_hidden(&self, unique_id: &str);
}

/// One platform entity backed by a hub device.
pub struct Entity {
    key: EntityKey,
    kind: EntityKind,
    unique_id: String,
    name: String,
    hidden: bool,
    coordinator: Coordinator,
    state: watch::Sender<Arc<Device>>,
    debouncer: Debouncer,
    registered: AtomicBool,
}

impl Entity {
    /// Build an entity for `device`, or `None` if no entity kind represents it.
    ///
    /// Name and hidden flag are fixed here; a later rename or
    /// reclassification of the device does not reach an existing entity.
    pub fn new(coordinator: Coordinator, device: Arc<Device>) -> Option<Self> {
        let kind = EntityKind::for_device(&device)?;
        let key = EntityKey::new(kind.platform(), device.id);
        let name = device.full_name();
        let hidden = device.hidden;
        let (state, _) = watch::channel(device);
        Some(Self {
            unique_id: format!("crestron_{}_{}", key.platform, key.id),
            name,
            hidden,
            key,
            kind,
            coordinator,
            state,
            debouncer: Debouncer::new(DEBOUNCE_DELAY),
            registered: AtomicBool::new(false),
        })
    }

    /// One entity per representable device in the current snapshot.
    pub fn from_snapshot(coordinator: &Coordinator) -> Vec<Arc<Self>> {
        coordinator
            .snapshot()
            .iter()
            .flat_map(|(_, devices)| devices.values())
            .filter_map(|device| Self::new(coordinator.clone(), Arc::clone(device)))
            .map(Arc::new)
            .collect()
    }

    // ── Identity ─────────────────────────────────────────────────────

    pub fn key(&self) -> EntityKey {
        self.key
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn platform(&self) -> PlatformType {
        self.key.platform
    }

    /// Stable id: `crestron_{platform}_{id}`.
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Display name, the device's room-qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    // ── State ────────────────────────────────────────────────────────

    /// The device as this entity currently sees it.
    pub fn device(&self) -> Arc<Device> {
        Arc::clone(&self.state.borrow())
    }

    /// Subscribe to this entity's state, optimistic updates included.
    pub fn watch(&self) -> watch::Receiver<Arc<Device>> {
        self.state.subscribe()
    }

    /// Scenes track the coordinator's health; everything else its connection.
    pub fn available(&self) -> bool {
        if self.kind == EntityKind::Scene {
            return self.coordinator.last_update_success();
        }
        self.device().is_available()
    }

    /// Pull this entity's device from the latest snapshot.
    ///
    /// Skipped while an optimistic update is cooling down. A device missing
    /// from the snapshot leaves the last known copy in place.
    pub fn handle_coordinator_update(&self) {
        if self.coordinator.is_suppressed(&self.key) {
            debug!(entity = %self.key, "optimistic cooldown active, ignoring poll");
            return;
        }
        let Some(fresh) = self
            .coordinator
            .snapshot()
            .get(self.key.platform, self.key.id)
            .cloned()
        else {
            return;
        };
        self.state.send_if_modified(|current| {
            if Arc::ptr_eq(current, &fresh) || **current == *fresh {
                return false;
            }
            *current = fresh;
            true
        });
    }

    /// Register with the coordinator so every publish reaches this entity.
    ///
    /// The entity stays attached until the handle is dropped.
    pub fn attach(self: &Arc<Self>) -> ListenerHandle {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.coordinator.subscribe(move || {
            if let Some(entity) = weak.upgrade() {
                entity.handle_coordinator_update();
            }
        })
    }

    /// Called once the host has added the entity. Hidden entities report
    /// themselves to the registry the first time only.
    pub fn added(&self, registry: &dyn EntityRegistry) {
        if self.hidden && !self.registered.swap(true, Ordering::SeqCst) {
            debug!(entity = %self.unique_id, "registering entity as hidden");
            registry.mark_hidden(&self.unique_id);
        }
    }

    // ── Optimistic updates ───────────────────────────────────────────

    /// Mutate the local copy, publish it, and start the cooldown.
    fn apply_optimistic(&self, update: impl FnOnce(&mut Device)) {
        self.state
            .send_modify(|device| update(Arc::make_mut(device)));
        if self.kind.is_controllable() {
            self.coordinator.suppress(self.key);
        }
    }

    /// Send a command now.
    async fn send(&self, command: Command) -> Result<(), CoreError> {
        self.coordinator.execute(command).await
    }

    /// Send a command after the debounce window, unless a newer one
    /// replaces it first. Failures are logged; the caller has moved on.
    fn send_debounced(&self, command: Command) {
        let coordinator = self.coordinator.clone();
        let entity = self.key;
        self.debouncer.schedule(async move {
            if let Err(e) = coordinator.execute(command).await {
                warn!(%entity, error = %e, "debounced command failed");
            }
        });
    }

    fn unsupported(&self, operation: &'static str) -> CoreError {
        CoreError::Unsupported {
            operation,
            kind: self.kind,
        }
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("unique_id", &self.unique_id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
