//! Server replies.

use crate::error::{Error, Result};
use std::fmt;

/// Reply class, from the first digit of the code (RFC 5321 §4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// 2xx
    Completed,
    /// 3xx
    Intermediate,
    /// 4xx
    TransientFailure,
    /// 5xx
    PermanentFailure,
    /// Anything outside 200..=599.
    Unknown,
}

/// Three-digit reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 greeting / ready to start TLS.
    pub const SERVICE_READY: Self = Self(220);
    /// 221 closing channel.
    pub const CLOSING: Self = Self(221);
    /// 235 authentication succeeded.
    pub const AUTH_SUCCESS: Self = Self(235);
    /// 250 requested action completed.
    pub const OK: Self = Self(250);
    /// 334 server challenge.
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 start mail input.
    pub const START_DATA: Self = Self(354);
    /// 535 authentication credentials invalid.
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 mailbox unavailable.
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Reply class.
    #[must_use]
    pub const fn class(self) -> ReplyClass {
        match self.0 / 100 {
            2 => ReplyClass::Completed,
            3 => ReplyClass::Intermediate,
            4 => ReplyClass::TransientFailure,
            5 => ReplyClass::PermanentFailure,
            _ => ReplyClass::Unknown,
        }
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A complete (possibly multi-line) reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code shared by every line.
    pub code: ReplyCode,
    /// Text of each line, code and separator removed.
    pub message: Vec<String>,
}

impl Reply {
    /// Builds a reply from its parts.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// True for any 2xx reply.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code.class(), ReplyClass::Completed)
    }

    /// Reply text with lines joined by `\n`.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }

    /// Turns the reply into an [`Error::SmtpError`].
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::smtp_error(self.code.as_u16(), self.message_text())
    }

    /// Passes the reply through if it carries exactly `code`.
    ///
    /// # Errors
    ///
    /// Returns the reply as an [`Error::SmtpError`] otherwise.
    pub fn expect_code(self, code: ReplyCode) -> Result<Self> {
        if self.code == code {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    /// Passes the reply through if it is any 2xx.
    ///
    /// # Errors
    ///
    /// Returns the reply as an [`Error::SmtpError`] otherwise.
    pub fn expect_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }
}
