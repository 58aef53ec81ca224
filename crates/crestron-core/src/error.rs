// ── Core error types ──
//
// User-facing errors from crestron-core. Consumers never see reqwest
// errors or HTTP status handling directly: the `From<crestron_api::Error>`
// impl folds the transport taxonomy into three families (connection,
// authentication, API) that the coordinator treats identically.
//
// `CoreError` is `Clone` so one failed refresh can be handed to every
// caller that joined it.

use strum::Display;
use thiserror::Error;

use crate::kind::EntityKind;
use crate::model::PlatformType;

/// Hub collection fetched during a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Collection {
    Devices,
    Sensors,
    Thermostats,
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to hub: {reason}")]
    Connection { reason: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Poll errors ──────────────────────────────────────────────────
    /// One collection of a poll failed; the whole poll was discarded.
    #[error("Failed to fetch {collection}: {source}")]
    Fetch {
        collection: Collection,
        source: Box<CoreError>,
    },

    /// The first refresh after startup failed.
    #[error("Hub not ready: {source}")]
    NotReady { source: Box<CoreError> },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("{operation} is not supported by {kind} entities")]
    Unsupported {
        operation: &'static str,
        kind: EntityKind,
    },

    #[error("No {platform} device with id {id}")]
    NotFound { platform: PlatformType, id: u32 },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Tag a transport error with the collection whose fetch produced it.
    pub fn fetch(collection: Collection, err: crestron_api::Error) -> Self {
        Self::Fetch {
            collection,
            source: Box::new(err.into()),
        }
    }

    /// Strip `Fetch` / `NotReady` wrappers down to the transport family.
    pub fn root(&self) -> &CoreError {
        match self {
            Self::Fetch { source, .. } | Self::NotReady { source } => source.root(),
            other => other,
        }
    }

    /// Returns `true` if the hub could not be reached.
    pub fn is_connection(&self) -> bool {
        matches!(self.root(), Self::Connection { .. })
    }

    /// Returns `true` if the hub rejected the token or session.
    pub fn is_auth(&self) -> bool {
        matches!(self.root(), Self::Authentication { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<crestron_api::Error> for CoreError {
    fn from(err: crestron_api::Error) -> Self {
        match err {
            crestron_api::Error::Connection(ref e) => CoreError::Connection {
                reason: if e.is_timeout() {
                    "request timed out".into()
                } else {
                    e.to_string()
                },
            },
            crestron_api::Error::Timeout { timeout_secs } => CoreError::Connection {
                reason: format!("request timed out after {timeout_secs}s"),
            },
            crestron_api::Error::Tls(msg) => CoreError::Connection {
                reason: format!("TLS error: {msg}"),
            },
            crestron_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid hub URL: {e}"),
            },
            crestron_api::Error::Authentication { message } => {
                CoreError::Authentication { message }
            }
            crestron_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            crestron_api::Error::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("malformed payload: {message}"),
                status: None,
            },
        }
    }
}
