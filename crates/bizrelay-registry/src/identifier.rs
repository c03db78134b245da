//! SIREN / SIRET identifier validation.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

const SIREN_LEN: usize = 9;
const SIRET_LEN: usize = 14;

/// Kind of business identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// 9-digit company identifier.
    Siren,
    /// 14-digit establishment identifier (SIREN + 5-digit NIC).
    Siret,
}

/// Which identifier lengths a deployment accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Accept 9 (SIREN) or 14 (SIRET) digits.
    #[default]
    SirenOrSiret,
    /// Accept only 14-digit SIRETs.
    SiretOnly,
}

impl IdentifierPolicy {
    const fn reason(self) -> &'static str {
        match self {
            Self::SirenOrSiret => "must be 9 or 14 digits",
            Self::SiretOnly => "must be 14 digits",
        }
    }

    const fn accepts(self, len: usize) -> bool {
        match self {
            Self::SirenOrSiret => len == SIREN_LEN || len == SIRET_LEN,
            Self::SiretOnly => len == SIRET_LEN,
        }
    }
}

impl FromStr for IdentifierPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "siren-or-siret" => Ok(Self::SirenOrSiret),
            "siret-only" => Ok(Self::SiretOnly),
            other => Err(Error::Config(format!(
                "unknown identifier policy {other:?} (expected siren-or-siret or siret-only)"
            ))),
        }
    }
}

/// A validated SIREN or SIRET.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validates a candidate identifier under the given policy.
    ///
    /// Only ASCII digits are accepted; surrounding whitespace is not trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] if the candidate has the wrong
    /// length or contains a non-digit.
    pub fn parse(candidate: &str, policy: IdentifierPolicy) -> Result<Self> {
        let all_digits = !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_digit());
        if !all_digits || !policy.accepts(candidate.len()) {
            return Err(Error::invalid_identifier(policy.reason()));
        }
        Ok(Self(candidate.to_string()))
    }

    /// Returns the identifier kind.
    #[must_use]
    pub fn kind(&self) -> IdentifierKind {
        if self.0.len() == SIRET_LEN {
            IdentifierKind::Siret
        } else {
            IdentifierKind::Siren
        }
    }

    /// Returns the identifier digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the SIREN (the identifier itself, or the first 9 digits of a SIRET).
    #[must_use]
    pub fn siren(&self) -> &str {
        &self.0[..SIREN_LEN]
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
