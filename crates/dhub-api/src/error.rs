use thiserror::Error;

/// Top-level error type for the `dhub-api` crate.
///
/// Covers transport failures, non-2xx responses from DeviceHub, payloads
/// that do not match the expected wire shape, and blockchain bridge
/// failures. `dhub-core` maps these into `CoreError::Api`.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing or joining error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── DeviceHub ───────────────────────────────────────────────────
    /// The server answered with a non-success status.
    #[error("DeviceHub error (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    /// The session token was rejected.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Blockchain ──────────────────────────────────────────────────
    /// The blockchain bridge rejected or failed an operation.
    #[error("Blockchain error: {0}")]
    Blockchain(String),
}

impl Error {
    /// Returns `true` if the session token should be renewed.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Nothing in the workspace retries automatically; this is for callers
    /// that want to offer a "try again" action.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Status { status: 404, .. } => true,
            _ => false,
        }
    }
}
