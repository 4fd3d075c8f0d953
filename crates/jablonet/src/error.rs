//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use jablonet_config::ConfigError;
use jablonet_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Could not load configuration")]
    #[diagnostic(
        code(jablonet::config),
        help(
            "Check the config file ({path}).\n\
             Required keys: username, and password or password_env."
        )
    )]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    #[error("Invalid settings: {message}")]
    #[diagnostic(
        code(jablonet::invalid_settings),
        help("poll_interval must be at least 5 seconds; username and password are required.")
    )]
    InvalidSettings { message: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(jablonet::auth_failed),
        help("Verify the account e-mail and password by logging in to the Jablonet web app.")
    )]
    AuthFailed { message: String },

    // ── Connectivity ─────────────────────────────────────────────────

    #[error("Could not reach the Jablonet cloud: {message}")]
    #[diagnostic(
        code(jablonet::connection_failed),
        help("Check network access and DNS resolution for api.jablonet.net.")
    )]
    ConnectionFailed { message: String },

    #[error("Request timed out: {message}")]
    #[diagnostic(code(jablonet::timeout), help("Try a larger request_timeout."))]
    Timeout { message: String },

    // ── Polling ──────────────────────────────────────────────────────

    #[error("Polling stopped")]
    #[diagnostic(code(jablonet::polling))]
    Polling {
        #[source]
        source: CoreError,
    },

    #[error("HTTP client setup failed")]
    #[diagnostic(code(jablonet::client))]
    Client {
        #[source]
        source: jablonet_api::Error,
    },

    #[error("Could not write output")]
    #[diagnostic(code(jablonet::io))]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::InvalidSettings { .. } => exit_code::CONFIG,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Polling { .. } | Self::Client { .. } | Self::Io(_) => exit_code::GENERAL,
        }
    }

    pub fn config(path: &std::path::Path, source: ConfigError) -> Self {
        Self::Config {
            path: path.display().to_string(),
            source,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => Self::InvalidSettings { message },
            CoreError::AuthFailure { message } => Self::AuthFailed { message },
            CoreError::Timeout { context } => Self::Timeout { message: context },
            CoreError::TransientResolution { message, .. } | CoreError::Transport { message } => {
                Self::ConnectionFailed { message }
            }
            other => Self::Polling { source: other },
        }
    }
}

impl From<jablonet_api::Error> for CliError {
    fn from(source: jablonet_api::Error) -> Self {
        Self::Client { source }
    }
}
