//! Device-state reconciliation between `crestron-api` and entity consumers.
//!
//! This crate keeps a stable, classified picture of every device on a
//! Crestron Home hub and republishes it on a fixed cadence:
//!
//! - **[`DeviceManager`]** — Fetches the device, sensor and thermostat
//!   collections concurrently, merges them into a table keyed by
//!   `{namespace}:{id}`, classifies visibility and availability, and reports
//!   what was discovered, changed or removed. A failed fetch leaves the
//!   table untouched.
//!
//! - **[`Coordinator`]** — Owns the refresh cycle: interval task, coalesced
//!   on-demand refreshes, the published [`Snapshot`], listener notification
//!   and the optimistic cooldown registry.
//!   [`Coordinator::oneshot()`](Coordinator::oneshot) serves single CLI runs.
//!
//! - **[`Entity`]** — One consumer-facing device. Reads from the snapshot,
//!   applies commands optimistically, and debounces slider bursts.
//!   [`EntityTracker`] adds entities for devices discovered after setup.
//!
//! - **[`Command`]** — Typed writes routed to the matching [`HubApi`] call.
//!
//! - **Data contracts** ([`kind`]) — What each entity kind reads from a
//!   device: percentages, brightness, sensor states, thermostat payloads.

pub mod command;
pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod kind;
pub mod manager;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::Command;
pub use config::{HubConfig, PollSettings};
pub use coordinator::{Coordinator, ListenerHandle, RefreshState};
pub use entity::{Entity, EntityRegistry, EntityTracker};
pub use error::{Collection, CoreError};
pub use kind::EntityKind;
pub use manager::{ChangeSet, DeviceManager, RemovedDevice};

pub use crestron_api::{HubApi, RawRecord, Room};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Availability, Connection, Device, DeviceKey, EntityKey, Namespace, PlatformType, Reading,
    Snapshot,
};
