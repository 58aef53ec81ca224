//! Clap derive structures for the `crestron` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// crestron -- inspect and drive a Crestron Home hub
#[derive(Debug, Parser)]
#[command(
    name = "crestron",
    version,
    about = "Inspect and control a Crestron Home hub from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Hub profile to use
    #[arg(long, short = 'p', env = "CRESTRON_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Hub host name or IP (overrides profile)
    #[arg(long, short = 'H', env = "CRESTRON_HOST", global = true)]
    pub host: Option<String>,

    /// Web API token
    #[arg(long, env = "CRESTRON_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Verify the hub's TLS certificate
    #[arg(long, global = true)]
    pub verify_ssl: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one key per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the classified device table
    #[command(alias = "d")]
    Devices(DevicesArgs),

    /// Poll continuously and log what changes
    Watch,

    /// Control a light
    Light(LightArgs),

    /// Control a shade
    Shade(ShadeArgs),

    /// Recall a scene
    Scene {
        /// Scene id
        id: u32,
    },

    /// Control a thermostat
    Thermostat(ThermostatArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Include hidden devices
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Only this platform type (light, shade, scene, binary_sensor, sensor, thermostat)
    #[arg(long, short = 't')]
    pub r#type: Option<String>,
}

// ── Lights ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LightArgs {
    /// Light id
    pub id: u32,

    #[command(subcommand)]
    pub action: LightAction,
}

#[derive(Debug, Subcommand)]
pub enum LightAction {
    /// Turn on, optionally at a brightness percentage
    On {
        #[arg(long, short = 'b', value_parser = clap::value_parser!(u8).range(0..=100))]
        brightness: Option<u8>,

        /// Fade time in seconds
        #[arg(long, default_value = "0")]
        transition: u32,
    },
    /// Turn off
    Off {
        /// Fade time in seconds
        #[arg(long, default_value = "0")]
        transition: u32,
    },
}

// ── Shades ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ShadeArgs {
    /// Shade id
    pub id: u32,

    #[command(subcommand)]
    pub action: ShadeAction,
}

#[derive(Debug, Subcommand)]
pub enum ShadeAction {
    Open,
    Close,
    Stop,
    /// Move to a position percentage (0 closed, 100 open)
    Position {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },
}

// ── Thermostats ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ThermostatArgs {
    /// Thermostat id
    pub id: u32,

    #[command(subcommand)]
    pub action: ThermostatAction,
}

#[derive(Debug, Subcommand)]
pub enum ThermostatAction {
    /// Show current readings
    Show,
    /// Set the system mode (off, heat, cool, auto)
    Mode { mode: String },
    /// Set the target temperature in degrees
    Setpoint { temperature: f64 },
    /// Set the fan mode
    Fan { mode: String },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,
    /// Show the loaded configuration (tokens redacted)
    Show,
    /// Store a profile's token in the system keyring
    SetToken {
        /// The web API token
        token: String,
    },
}
