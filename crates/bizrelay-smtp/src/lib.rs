//! # bizrelay-smtp
//!
//! Async SMTP submission client (RFC 5321) used to relay outbound mail.
//!
//! ## Features
//!
//! - **Type-state sessions**: a message can only be written after MAIL FROM,
//!   at least one RCPT TO and an accepted DATA command
//! - **Two secure transports**: implicit TLS (port 465) and STARTTLS (port 587),
//!   selected through [`Security`] at [`connection::establish`]
//! - **Authentication**: PLAIN and LOGIN
//! - **Extensions**: STARTTLS, AUTH, SIZE, PIPELINING, 8BITMIME discovery
//!
//! ## Quick Start
//!
//! ```ignore
//! use bizrelay_smtp::{Address, Security};
//! use bizrelay_smtp::connection::establish;
//!
//! #[tokio::main]
//! async fn main() -> bizrelay_smtp::Result<()> {
//!     let client = establish("smtp.example.com", 465, Security::Implicit, "localhost").await?;
//!     let client = client.auth_plain("user@example.com", "password").await?;
//!
//!     let client = client
//!         .mail_from(Address::new("user@example.com")?, None)
//!         .await?
//!         .rcpt_to(Address::new("recipient@example.com")?)
//!         .await?
//!         .data()
//!         .await?;
//!
//!     let client = client.send_message(b"Subject: Test\r\n\r\nHello\r\n").await?;
//!     client.quit().await
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! Connected ── auth_*() ──→ Authenticated
//!     │                          │
//!     └────── mail_from() ───────┴──→ MailTransaction ── rcpt_to() ──→ RecipientAdded
//!                                                                          │
//!                                              Connected ←─ send_message() ─ Data ←─ data()
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, Security, ServerInfo,
    SmtpConnection, TransactionReady,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyClass, ReplyCode};
