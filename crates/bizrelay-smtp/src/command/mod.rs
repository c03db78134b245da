//! Client commands.

use crate::types::{Address, AuthMechanism};
use std::fmt;

/// Commands issued during a submission session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `EHLO <hostname>`
    Ehlo {
        /// Name the client announces.
        hostname: String,
    },
    /// `STARTTLS`
    StartTls,
    /// `AUTH <mechanism> [initial-response]`
    Auth {
        /// SASL mechanism.
        mechanism: AuthMechanism,
        /// Initial response sent on the same line (RFC 4954).
        initial_response: Option<String>,
    },
    /// Base64 line answering a 334 challenge.
    AuthResponse(String),
    /// `MAIL FROM:<addr> [SIZE=n]`
    MailFrom {
        /// Envelope sender.
        from: Address,
        /// Declared message size.
        size: Option<usize>,
    },
    /// `RCPT TO:<addr>`
    RcptTo {
        /// Envelope recipient.
        to: Address,
    },
    /// `DATA`
    Data,
    /// `QUIT`
    Quit,
}

impl fmt::Display for Command {
    /// Writes the command line without its CRLF terminator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ehlo { hostname } => write!(f, "EHLO {hostname}"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::Auth {
                mechanism,
                initial_response: Some(response),
            } => write!(f, "AUTH {} {response}", mechanism.as_str()),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => write!(f, "AUTH {}", mechanism.as_str()),
            Self::AuthResponse(line) => f.write_str(line),
            Self::MailFrom { from, size } => {
                write!(f, "MAIL FROM:<{from}>")?;
                if let Some(size) = size {
                    write!(f, " SIZE={size}")?;
                }
                Ok(())
            }
            Self::RcptTo { to } => write!(f, "RCPT TO:<{to}>"),
            Self::Data => f.write_str("DATA"),
            Self::Quit => f.write_str("QUIT"),
        }
    }
}

impl Command {
    /// Wire form, CRLF-terminated.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        format!("{self}\r\n").into_bytes()
    }

    /// Log form with credentials masked.
    #[must_use]
    pub fn redacted(&self) -> String {
        match self {
            Self::Auth {
                initial_response: Some(_),
                mechanism,
            } => format!("AUTH {} ***", mechanism.as_str()),
            Self::AuthResponse(_) => "***".to_string(),
            other => other.to_string(),
        }
    }
}
