// crestron-api: Async Rust client for the Crestron Home OS local REST API

pub mod client;
pub mod error;
pub mod hub;
pub mod models;
pub mod transport;

pub use client::HubClient;
pub use error::Error;
pub use hub::{HubApi, record_id};
pub use models::{MAX_LEVEL, RawRecord, Room};
pub use transport::{TlsMode, TransportConfig};
