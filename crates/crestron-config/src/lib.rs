//! Shared configuration for the Crestron Home tools.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), validation,
//! and translation to `crestron_core::HubConfig`. The CLI layers its flag
//! overrides on top.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crestron_api::TlsMode;
use crestron_core::config::{DEFAULT_UPDATE_INTERVAL, MIN_UPDATE_INTERVAL};
use crestron_core::{HubConfig, PlatformType, PollSettings};

/// Service name used for keyring entries.
pub const KEYRING_SERVICE: &str = "crestron";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named hub profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Verify the hub's TLS certificate. Processors ship self-signed.
    #[serde(default)]
    pub verify_ssl: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Poll interval in seconds.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            verify_ssl: false,
            timeout: default_timeout(),
            update_interval: default_update_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL.as_secs()
}

/// One Crestron Home processor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Processor host name or IP, optionally with a port.
    pub host: String,

    /// Web API token (plaintext, prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable holding the token.
    pub token_env: Option<String>,

    pub verify_ssl: Option<bool>,

    pub timeout: Option<u64>,

    pub update_interval: Option<u64>,

    /// Platform types to expose (`light`, `shade`, `scene`,
    /// `binary_sensor`, `sensor`, `thermostat`). All when unset.
    pub enabled_types: Option<Vec<String>>,

    /// `%`-wildcard name / type patterns to hide.
    #[serde(default)]
    pub ignored_patterns: Vec<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "crestron-home", "crestron").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("crestron");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` merged with `CRESTRON_*` variables.
///
/// Nested keys use a double underscore:
/// `CRESTRON_PROFILES__HOME__HOST=10.0.0.5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CRESTRON_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve the hub token: env var named by the profile, then the system
/// keyring, then plaintext in the config.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
        .and_then(|entry| entry.set_password(token))
        .map_err(|e| ConfigError::Validation {
            field: "token".into(),
            reason: format!("keyring: {e}"),
        })
}

// ── Validation ──────────────────────────────────────────────────────

/// Parse and check the profile's poll settings.
pub fn poll_settings(profile: &Profile, defaults: &Defaults) -> Result<PollSettings, ConfigError> {
    let interval = profile.update_interval.unwrap_or(defaults.update_interval);
    if interval < MIN_UPDATE_INTERVAL.as_secs() {
        return Err(ConfigError::Validation {
            field: "update_interval".into(),
            reason: format!(
                "must be at least {}s, got {interval}s",
                MIN_UPDATE_INTERVAL.as_secs()
            ),
        });
    }

    let enabled_types = match &profile.enabled_types {
        None => PollSettings::default().enabled_types,
        Some(types) => types
            .iter()
            .map(|t| {
                t.parse::<PlatformType>()
                    .map_err(|_| ConfigError::Validation {
                        field: "enabled_types".into(),
                        reason: format!("unknown device type '{t}'"),
                    })
            })
            .collect::<Result<BTreeSet<_>, _>>()?,
    };

    Ok(PollSettings {
        enabled_types,
        ignored_patterns: profile
            .ignored_patterns
            .iter()
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty())
            .collect(),
        update_interval: Duration::from_secs(interval),
    })
}

/// Build a `HubConfig` from a profile, no CLI overrides.
pub fn profile_to_hub_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<HubConfig, ConfigError> {
    let token = resolve_token(profile, profile_name)?;
    hub_config_with_token(profile, token, defaults)
}

/// Build a `HubConfig` from a profile with an already resolved token.
pub fn hub_config_with_token(
    profile: &Profile,
    token: SecretString,
    defaults: &Defaults,
) -> Result<HubConfig, ConfigError> {
    let host = profile.host.trim();
    if host.is_empty() || host.contains('/') {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("expected a host name or IP, got '{}'", profile.host),
        });
    }

    let poll = poll_settings(profile, defaults)?;

    let tls = if profile.verify_ssl.unwrap_or(defaults.verify_ssl) {
        TlsMode::System
    } else {
        TlsMode::DangerAcceptInvalid
    };

    Ok(HubConfig {
        host: host.to_owned(),
        token,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        poll,
    })
}
