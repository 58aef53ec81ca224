//! Command handlers, one module per top-level subcommand.

pub mod config_cmd;
pub mod control;
pub mod devices;
pub mod watch;

use crestron_core::HubConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a hub-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    config: &HubConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(&args, config, global).await,
        Command::Watch => watch::handle(config, global).await,
        Command::Light(args) => control::light(args, config).await,
        Command::Shade(args) => control::shade(args, config).await,
        Command::Scene { id } => control::scene(id, config).await,
        Command::Thermostat(args) => control::thermostat(args, config, global).await,
        // Handled before a hub config is built
        Command::Config(_) => Ok(()),
    }
}
