//! Session establishment: the only place where the transport strategy differs.

use super::client::{Client, Connected};
use super::stream::{connect, connect_tls};
use crate::error::Result;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// TLS from the first byte (port 465).
    #[default]
    Implicit,
    /// Plaintext greeting, upgraded in-protocol with STARTTLS (port 587).
    StartTls,
    /// No encryption. Only for local relays and tests.
    None,
}

impl Security {
    /// Selects the strategy conventionally associated with a port:
    /// 465 is implicit TLS, every other port negotiates STARTTLS.
    #[must_use]
    pub const fn for_port(port: u16) -> Self {
        match port {
            465 => Self::Implicit,
            _ => Self::StartTls,
        }
    }
}

impl FromStr for Security {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tls" | "ssl" | "implicit" => Ok(Self::Implicit),
            "starttls" => Ok(Self::StartTls),
            "none" | "plain" => Ok(Self::None),
            other => Err(format!(
                "unknown SMTP security mode {other:?} (expected tls, starttls or none)"
            )),
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Implicit => "tls",
            Self::StartTls => "starttls",
            Self::None => "none",
        })
    }
}

/// Opens a session ready for authentication or a mail transaction.
///
/// Dials the relay with the given strategy, reads the greeting and sends
/// EHLO. With [`Security::StartTls`] the session is upgraded and EHLO is
/// repeated, so the returned client always reflects the capabilities
/// advertised on the final (encrypted) channel.
///
/// # Errors
///
/// Returns an error if the connection, greeting, EHLO or TLS upgrade fails.
pub async fn establish(
    host: &str,
    port: u16,
    security: Security,
    client_hostname: &str,
) -> Result<Client<Connected>> {
    debug!(host, port, %security, "opening SMTP session");

    let stream = match security {
        Security::Implicit => connect_tls(host, port).await?,
        Security::StartTls | Security::None => connect(host, port).await?,
    };

    let client = Client::from_stream(stream).await?.ehlo(client_hostname).await?;

    match security {
        Security::StartTls => client.starttls(host, client_hostname).await,
        Security::Implicit | Security::None => Ok(client),
    }
}
