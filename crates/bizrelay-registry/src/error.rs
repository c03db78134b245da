//! Error types for registry lookups.

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Registry error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The identifier failed shape validation; no request was made.
    #[error("Invalid identifier: {reason}")]
    InvalidIdentifier {
        /// Human-readable reason (e.g. "must be 9 or 14 digits").
        reason: String,
    },

    /// The registry has no record for the identifier (HTTP 404).
    #[error("Entity not found")]
    NotFound,

    /// The registry answered with an unexpected status.
    #[error("Upstream error ({status})")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnostics only.
        body: String,
    },

    /// Connection failure or timeout reaching the registry.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The registry payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Missing or invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Creates an invalid-identifier error.
    #[must_use]
    pub fn invalid_identifier(reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("invalid registry URL: {err}"))
    }
}
