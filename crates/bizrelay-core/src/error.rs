//! Error types for the core library.

use crate::email::{DeliveryError, ValidationError};
use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The send-email request is incomplete or malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Required configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The MIME message could not be composed.
    #[error("Composition error: {0}")]
    Compose(#[from] bizrelay_mime::Error),

    /// The relay rejected the message or could not be reached.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl Error {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
