//! Session errors.

use crate::types::{ReplyClass, ReplyCode};
use std::io;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of an SMTP session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket failure, including timeouts.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS handshake or record failure.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The relay answered with a 4xx or 5xx (or an unexpected) reply.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code.
        code: u16,
        /// Reply text, lines joined by `\n`.
        message: String,
    },

    /// A reply that does not follow RFC 5321 syntax.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The relay hung up.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// An envelope address that cannot be sent in MAIL FROM / RCPT TO.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// A required extension (STARTTLS, an AUTH mechanism) is not advertised.
    #[error("Server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Reply code, when the server answered negatively.
    #[must_use]
    pub const fn reply_code(&self) -> Option<ReplyCode> {
        match self {
            Self::SmtpError { code, .. } => Some(ReplyCode::new(*code)),
            _ => None,
        }
    }

    /// Returns true for a 5xx rejection; retrying the same message will not help.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.reply_code()
            .is_some_and(|code| code.class() == ReplyClass::PermanentFailure)
    }

    /// Returns true for a 4xx rejection.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.reply_code()
            .is_some_and(|code| code.class() == ReplyClass::TransientFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_reply_codes() {
        assert!(Error::smtp_error(550, "no such user").is_permanent());
        assert!(Error::smtp_error(451, "try later").is_transient());
        assert!(!Error::ConnectionClosed.is_permanent());
        assert_eq!(Error::ConnectionClosed.reply_code(), None);
        assert_eq!(
            Error::smtp_error(552, "too big").reply_code(),
            Some(ReplyCode::new(552))
        );
    }
}
