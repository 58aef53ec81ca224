//! CLI-flag-aware wrappers around `crestron-config`.

use crestron_config::{Config, Profile, hub_config_with_token, resolve_token};
use crestron_core::HubConfig;
use secrecy::SecretString;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `HubConfig` from the config file, profile, and CLI overrides.
pub fn build_hub_config(global: &GlobalOpts) -> Result<HubConfig, CliError> {
    let cfg = crestron_config::load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        // No profile: --host / CRESTRON_HOST alone is enough
        None if global.host.is_some() => Profile::default(),
        None => {
            return Err(CliError::NoConfig {
                path: crestron_config::config_path().display().to_string(),
            });
        }
    };

    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if global.verify_ssl {
        profile.verify_ssl = Some(true);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }

    let token = match global.token {
        Some(ref token) => SecretString::from(token.clone()),
        None => resolve_token(&profile, &profile_name)?,
    };

    Ok(hub_config_with_token(&profile, token, &cfg.defaults)?)
}
