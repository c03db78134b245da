//! Envelope mailbox.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Mailbox used in `MAIL FROM` and `RCPT TO`.
///
/// Only the shape is checked (`local@domain`, one `@`, no characters that
/// could break out of the angle brackets). Deliverability is the relay's call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Validates and wraps a mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the mailbox is malformed.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        check(&addr).map_err(|reason| Error::InvalidAddress(format!("{reason}: {addr:?}")))?;
        Ok(Self(addr))
    }

    /// The mailbox as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check(addr: &str) -> std::result::Result<(), &'static str> {
    if addr.is_empty() {
        return Err("empty address");
    }
    if addr
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>'))
    {
        return Err("forbidden character");
    }
    match addr.split('@').collect::<Vec<_>>().as_slice() {
        [local, domain] if !local.is_empty() && !domain.is_empty() => Ok(()),
        [_, _] => Err("empty local part or domain"),
        _ => Err("expected exactly one '@'"),
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
