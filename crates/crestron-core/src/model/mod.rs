// ── Domain model ──
//
// The device table's record type, its keys, and the grouped snapshot
// published after every successful poll.

pub mod device;
pub mod key;
pub mod snapshot;

pub use device::{
    Availability, ChangeFields, Connection, DOOR_STATUS_CLOSED, DOOR_STATUS_OPEN, Device,
    PRESENCE_UNAVAILABLE, PRESENCE_VACANT, Reading,
};
pub use key::{DeviceKey, EntityKey, Namespace, PlatformType};
pub use snapshot::Snapshot;
