//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use dhub_config::ConfigError;
use dhub_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the DeviceHub server: {message}")]
    #[diagnostic(
        code(dhub::connection_failed),
        help("Check the server URL and that it is reachable. Use --insecure (-k) for self-signed certificates.")
    )]
    ConnectionFailed { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(dhub::auth_failed),
        help("Store a fresh session token with: dhub config set-token <TOKEN>\nOr set DHUB_TOKEN.")
    )]
    AuthFailed,

    // ── Resources ────────────────────────────────────────────────────
    #[error("Not found: {message}")]
    #[diagnostic(code(dhub::not_found))]
    NotFound { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({status}): {message}")]
    #[diagnostic(code(dhub::api_error))]
    ApiError { status: String, message: String },

    #[error("Unexpected server data: {message}")]
    #[diagnostic(
        code(dhub::data),
        help("The server answered with a shape this client does not understand.")
    )]
    Data { message: String },

    #[error("{message}")]
    #[diagnostic(code(dhub::internal), help("This is a bug in dhub; please report it."))]
    Internal { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(dhub::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No server configured")]
    #[diagnostic(
        code(dhub::no_config),
        help("Pass --url, set DHUB_URL, or add a profile to {path}")
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(dhub::config))]
    Config(#[from] ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(dhub::json), help("Check the JSON argument and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML output failed: {0}")]
    #[diagnostic(code(dhub::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Json(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        if err.is_assertion() {
            return CliError::Internal {
                message: err.to_string(),
            };
        }
        match err {
            CoreError::AuthenticationFailed { .. } => CliError::AuthFailed,
            CoreError::NotFound { message } => CliError::NotFound { message },
            CoreError::Api {
                message,
                status: None,
            } => CliError::ConnectionFailed { message },
            CoreError::Api {
                message,
                status: Some(status),
            } => CliError::ApiError {
                status: status.to_string(),
                message,
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            other => CliError::Data {
                message: other.to_string(),
            },
        }
    }
}

impl From<dhub_api::Error> for CliError {
    fn from(err: dhub_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
