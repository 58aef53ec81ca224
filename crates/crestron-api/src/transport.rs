// Shared transport configuration for building the hub's reqwest::Client.

use std::time::Duration;

use crate::error::Error;

/// TLS verification mode.
///
/// Crestron processors ship with self-signed certificates, so the default
/// accepts anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Accept any certificate (for self-signed processors).
    #[default]
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("crestron-api/", env!("CARGO_PKG_VERSION")));

        if self.tls == TlsMode::DangerAcceptInvalid {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Map `verify_ssl` as stored in configuration onto a [`TlsMode`].
    pub fn with_verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.tls = if verify_ssl {
            TlsMode::System
        } else {
            TlsMode::DangerAcceptInvalid
        };
        self
    }
}
