#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use crestron_api::TlsMode;
use crestron_config::{
    Config, ConfigError, Defaults, Profile, hub_config_with_token, load_config_from, poll_settings,
    profile_to_hub_config, save_config_to,
};
use crestron_core::PlatformType;
use figment::Jail;
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};

const CONFIG: &str = r#"
default_profile = "home"

[defaults]
timeout = 5

[profiles.home]
host = "10.0.0.5"
token_env = "HOME_HUB_TOKEN"
update_interval = 30
enabled_types = ["light", "Shade", "scene"]
ignored_patterns = ["%bath%", "  ", "keypad"]
"#;

#[test]
fn loads_profile_and_builds_hub_config() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", CONFIG)?;
        jail.set_env("HOME_HUB_TOKEN", "secret-token");

        let config = load_config_from(Path::new("config.toml")).unwrap();
        let (name, profile) = config.profile(None).unwrap();
        assert_eq!(name, "home");

        let hub = profile_to_hub_config(profile, name, &config.defaults).unwrap();
        assert_eq!(hub.host, "10.0.0.5");
        assert_eq!(hub.token.expose_secret(), "secret-token");
        assert_eq!(hub.tls, TlsMode::DangerAcceptInvalid);
        assert_eq!(hub.timeout, Duration::from_secs(5));
        assert_eq!(hub.poll.update_interval, Duration::from_secs(30));
        assert_eq!(
            hub.poll.enabled_types,
            BTreeSet::from([PlatformType::Light, PlatformType::Shade, PlatformType::Scene])
        );
        assert_eq!(hub.poll.ignored_patterns, vec!["%bath%", "keypad"]);
        Ok(())
    });
}

#[test]
fn environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", CONFIG)?;
        jail.set_env("CRESTRON_PROFILES__HOME__HOST", "hub.local");
        jail.set_env("CRESTRON_DEFAULTS__VERIFY_SSL", "true");

        let config = load_config_from(Path::new("config.toml")).unwrap();
        let (_, profile) = config.profile(Some("home")).unwrap();
        assert_eq!(profile.host, "hub.local");
        assert!(config.defaults.verify_ssl);
        Ok(())
    });
}

#[test]
fn missing_file_yields_defaults() {
    Jail::expect_with(|_| {
        let config = load_config_from(Path::new("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(matches!(
            config.profile(None),
            Err(ConfigError::UnknownProfile { .. })
        ));
        Ok(())
    });
}

#[test]
fn interval_below_floor_is_rejected() {
    let profile = Profile {
        host: "hub".into(),
        update_interval: Some(5),
        ..Profile::default()
    };

    let err = poll_settings(&profile, &Defaults::default()).unwrap_err();

    assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "update_interval"));
}

#[test]
fn unknown_device_type_is_rejected() {
    let profile = Profile {
        host: "hub".into(),
        enabled_types: Some(vec!["light".into(), "sprinkler".into()]),
        ..Profile::default()
    };

    let err = poll_settings(&profile, &Defaults::default()).unwrap_err();

    assert!(err.to_string().contains("sprinkler"));
}

#[test]
fn defaults_enable_every_type() {
    let settings = poll_settings(&Profile::default(), &Defaults::default()).unwrap();

    assert_eq!(settings.enabled_types.len(), 6);
    assert_eq!(settings.update_interval, Duration::from_secs(15));
}

#[test]
fn host_with_path_is_rejected() {
    let profile = Profile {
        host: "https://hub/cws".into(),
        ..Profile::default()
    };

    let token = SecretString::from("t".to_owned());

    let err = hub_config_with_token(&profile, token, &Defaults::default()).unwrap_err();

    assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "host"));
}

#[test]
fn save_then_load_round_trips() {
    Jail::expect_with(|_| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                host: "192.168.1.20".into(),
                token_env: Some("HUB_TOKEN".into()),
                ignored_patterns: vec!["%garage%".into()],
                ..Profile::default()
            },
        );

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded.profiles, config.profiles);
        Ok(())
    });
}
