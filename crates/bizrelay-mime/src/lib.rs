//! # bizrelay-mime
//!
//! MIME message composition and parsing for outbound transactional mail.
//!
//! ## Features
//!
//! - **Deterministic output**: headers and content-type parameters keep
//!   insertion order, so the same input always yields the same bytes
//! - **multipart/mixed composition**: one text part plus optional attachments
//! - **Encodings**: Base64 re-wrapped to 76 columns, Quoted-Printable,
//!   RFC 2047 header words
//! - **Parsing**: reads composed messages back into headers and parts
//!
//! ## Composing a message
//!
//! ```ignore
//! use bizrelay_mime::{Attachment, MessageBuilder};
//!
//! let attachment = Attachment::from_base64("devis.pdf", "JVBERi0xLjQK")?;
//!
//! let bytes = MessageBuilder::new()
//!     .from("contact@example.com")
//!     .to("client@example.com")
//!     .subject("Votre devis")
//!     .text_body("Bonjour,\nvoici le devis.")
//!     .attach(attachment)
//!     .build()?;
//! ```
//!
//! ## Reading it back
//!
//! ```ignore
//! use bizrelay_mime::Message;
//!
//! let message = Message::parse(std::str::from_utf8(&bytes)?)?;
//! assert_eq!(message.parts.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod builder;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use builder::{Attachment, MessageBuilder, generate_boundary};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, TransferEncoding};
