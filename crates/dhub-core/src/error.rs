// ── Core error types ──
//
// Three families: caller-side assertion failures (posting twice, paging
// past the end, a tree node without its lot), data-shape failures (an
// unknown `type` discriminator, a payload that does not parse), and
// wrapped transport errors. The `From<dhub_api::Error>` impl keeps HTTP
// details out of consumers' match arms.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Assertion errors ─────────────────────────────────────────────
    #[error("{type_name} {id} has already been posted")]
    AlreadyPosted { type_name: String, id: String },

    #[error("{type_name} must exist on the server before patching it")]
    NotPosted { type_name: String },

    #[error("Tried to get more resources but there are no more pages available")]
    NoMorePages,

    #[error("Lot {id} is not in cache")]
    LotNotCached { id: String },

    #[error("Invariant violated: {message}")]
    Invariant { message: String },

    // ── Data-shape errors ────────────────────────────────────────────
    #[error("{type_name} is not a valid resource")]
    UnknownType { type_name: String },

    #[error("Cannot parse {what}: {message}")]
    Parse { what: String, message: String },

    // ── Transport errors (wrapped) ───────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Batch errors ─────────────────────────────────────────────────
    /// A sequential proof batch stopped at `index`; earlier proofs stay
    /// on chain.
    #[error("Proof {index} of the batch failed after {} completed: {source}", completed.len())]
    ProofBatch {
        index: usize,
        completed: Vec<String>,
        #[source]
        source: Box<CoreError>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub(crate) fn parse(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error points at a caller-side logic defect rather than
    /// at the server or the network.
    pub fn is_assertion(&self) -> bool {
        matches!(
            self,
            Self::AlreadyPosted { .. }
                | Self::NotPosted { .. }
                | Self::NoMorePages
                | Self::LotNotCached { .. }
                | Self::Invariant { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<dhub_api::Error> for CoreError {
    fn from(err: dhub_api::Error) -> Self {
        if err.is_not_found() {
            return CoreError::NotFound {
                message: err.to_string(),
            };
        }
        match err {
            dhub_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            dhub_api::Error::Status { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            dhub_api::Error::Transport(ref e) => CoreError::Api {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            dhub_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            dhub_api::Error::Deserialization { message, body: _ } => CoreError::Parse {
                what: "server response".into(),
                message,
            },
            dhub_api::Error::Blockchain(message) => CoreError::Api {
                message: format!("Blockchain: {message}"),
                status: None,
            },
        }
    }
}
