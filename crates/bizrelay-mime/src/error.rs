//! Errors raised while composing or reading back MIME messages.

use std::string::FromUtf8Error;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Composition and parsing failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `Content-Type` value is not `type/subtype[; params]`.
    #[error("malformed content type: {0}")]
    InvalidContentType(String),

    /// A Base64, quoted-printable or encoded-word payload is malformed.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Decoded bytes are not UTF-8 text.
    #[error("decoded text is not UTF-8: {0}")]
    NotUtf8(#[from] FromUtf8Error),

    /// A multipart content type without a `boundary` parameter.
    #[error("multipart content type has no boundary")]
    MissingBoundary,

    /// A multipart body that is truncated or has no parts.
    #[error("malformed multipart body: {0}")]
    InvalidMultipart(String),

    /// The builder was asked to produce a message without a required header.
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    /// No `text/plain` body part exists.
    #[error("message has no text/plain part")]
    NoTextPart,
}

impl Error {
    /// Returns true if the failure comes from caller-supplied content
    /// (an attachment payload or content type) rather than from the builder.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidEncoding(_) | Self::InvalidContentType(_))
    }
}
