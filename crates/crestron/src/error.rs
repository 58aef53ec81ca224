//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use crestron_config::ConfigError;
use crestron_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the hub: {reason}")]
    #[diagnostic(
        code(crestron::connection_failed),
        help(
            "Check that the processor is reachable and the host is right.\n\
             Processors use self-signed certificates; drop --verify-ssl if set."
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Hub is not ready: {reason}")]
    #[diagnostic(
        code(crestron::not_ready),
        help("The first poll failed. Re-run with -vv to see which collection.")
    )]
    NotReady { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(crestron::auth_failed),
        help(
            "Generate a web API token in the Crestron Home setup app.\n\
             Store it with: crestron config set-token <TOKEN>"
        )
    )]
    AuthFailed { message: String },

    #[error("No token configured for profile '{profile}'")]
    #[diagnostic(
        code(crestron::no_credentials),
        help("Set CRESTRON_TOKEN, pass --token, or run: crestron config set-token <TOKEN>")
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{platform} '{id}' not found")]
    #[diagnostic(
        code(crestron::not_found),
        help("Run: crestron devices --type {platform}")
    )]
    NotFound { platform: String, id: u32 },

    #[error("{0}")]
    #[diagnostic(code(crestron::unsupported))]
    Unsupported(String),

    // ── API ──────────────────────────────────────────────────────────
    #[error("Hub API error: {message}")]
    #[diagnostic(code(crestron::api_error))]
    ApiError { message: String },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(crestron::validation))]
    Validation { field: String, reason: String },

    #[error("No hub configured")]
    #[diagnostic(
        code(crestron::no_config),
        help(
            "Pass --host and --token, or create a profile in:\n\
             {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(crestron::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(crestron::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NotReady { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported(_) => exit_code::UNSUPPORTED,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotReady { ref source } if source.is_auth() => CliError::AuthFailed {
                message: source.root().to_string(),
            },
            CoreError::NotReady { ref source } if source.is_connection() => {
                CliError::ConnectionFailed {
                    reason: source.root().to_string(),
                }
            }
            CoreError::NotReady { source } => CliError::NotReady {
                reason: source.to_string(),
            },
            CoreError::Connection { reason } => CliError::ConnectionFailed { reason },
            CoreError::Authentication { message } => CliError::AuthFailed { message },
            CoreError::NotFound { platform, id } => CliError::NotFound {
                platform: platform.to_string(),
                id,
            },
            err @ CoreError::Unsupported { .. } => CliError::Unsupported(err.to_string()),
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            other => CliError::ApiError {
                message: other.to_string(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { .. } => CliError::NoConfig {
                path: crestron_config::config_path().display().to_string(),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: e.to_string(),
            },
        }
    }
}
