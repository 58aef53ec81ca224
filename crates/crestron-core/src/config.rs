// ── Runtime hub configuration ──
//
// These types describe *how* to reach a hub and *what* to expose from it.
// They carry credential data and poll tuning, but never touch disk: the
// CLI builds a `HubConfig` (usually via crestron-config) and hands it in.

use std::collections::BTreeSet;
use std::time::Duration;

use crestron_api::{HubClient, TlsMode, TransportConfig};
use secrecy::SecretString;
use strum::IntoEnumIterator;

use crate::error::CoreError;
use crate::model::PlatformType;

/// Poll interval used when none is configured.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(15);

/// Floor applied to any configured poll interval.
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(10);

/// What to poll and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Platform types to expose. Devices of other mapped types are hidden.
    pub enabled_types: BTreeSet<PlatformType>,
    /// `%`-wildcard patterns matched against full names and hub types.
    pub ignored_patterns: Vec<String>,
    /// Requested interval; see [`effective_interval`](Self::effective_interval).
    pub update_interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            enabled_types: PlatformType::iter().collect(),
            ignored_patterns: Vec::new(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }
}

impl PollSettings {
    /// The configured interval, raised to [`MIN_UPDATE_INTERVAL`] if shorter.
    pub fn effective_interval(&self) -> Duration {
        self.update_interval.max(MIN_UPDATE_INTERVAL)
    }

    /// Enabled types as the tags the hub client expects.
    pub fn enabled_tags(&self) -> Vec<String> {
        self.enabled_types.iter().map(ToString::to_string).collect()
    }

    pub fn is_enabled(&self, platform: PlatformType) -> bool {
        self.enabled_types.contains(&platform)
    }
}

/// Configuration for connecting to a single hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Host name or IP of the processor (optionally `host:port`).
    pub host: String,
    /// Web API token from the Crestron Home setup app.
    pub token: SecretString,
    pub tls: TlsMode,
    pub timeout: Duration,
    pub poll: PollSettings,
}

impl HubConfig {
    pub fn new(host: impl Into<String>, token: SecretString) -> Self {
        Self {
            host: host.into(),
            token,
            tls: TlsMode::default(),
            timeout: TransportConfig::default().timeout,
            poll: PollSettings::default(),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls,
            timeout: self.timeout,
        }
    }

    /// Build an (unauthenticated) HTTP client for this hub.
    pub fn build_client(&self) -> Result<HubClient, CoreError> {
        if self.host.trim().is_empty() {
            return Err(CoreError::Config {
                message: "hub host is empty".into(),
            });
        }
        Ok(HubClient::new(
            self.host.trim(),
            self.token.clone(),
            &self.transport(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_is_floored() {
        let mut poll = PollSettings::default();
        assert_eq!(poll.effective_interval(), Duration::from_secs(15));

        poll.update_interval = Duration::from_secs(3);
        assert_eq!(poll.effective_interval(), MIN_UPDATE_INTERVAL);

        poll.update_interval = Duration::from_secs(60);
        assert_eq!(poll.effective_interval(), Duration::from_secs(60));
    }

    #[test]
    fn all_platforms_enabled_by_default() {
        let poll = PollSettings::default();
        assert_eq!(poll.enabled_types.len(), 6);
        assert!(poll.enabled_tags().contains(&"binary_sensor".to_owned()));
    }

    #[test]
    fn empty_host_is_rejected() {
        let config = HubConfig::new("  ", SecretString::from("t".to_owned()));
        assert!(matches!(
            config.build_client(),
            Err(CoreError::Config { .. })
        ));
    }
}
