//! `config` subcommands; none of these touch the hub.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::active_profile_name;
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match &args.command {
        ConfigCommand::Path => {
            output::print_output(
                &crestron_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Show => {
            let mut cfg = crestron_config::load_config()?;
            for profile in cfg.profiles.values_mut() {
                if profile.token.is_some() {
                    profile.token = Some("********".into());
                }
            }
            let rendered = toml::to_string_pretty(&cfg).map_err(|e| CliError::Validation {
                field: "config".into(),
                reason: e.to_string(),
            })?;
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::SetToken { token } => {
            let cfg = crestron_config::load_config_or_default();
            let profile = active_profile_name(global, &cfg);
            crestron_config::store_token(&profile, token)?;
            if !global.quiet {
                eprintln!("Token stored in the system keyring for profile '{profile}'");
            }
            Ok(())
        }
    }
}
