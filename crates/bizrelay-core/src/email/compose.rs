//! Turns a validated [`EmailMessage`] into RFC 5322 bytes.

use super::request::EmailMessage;
use bizrelay_mime::MessageBuilder;
use chrono::{DateTime, Utc};

/// Composes the multipart/mixed message for `message`.
///
/// # Errors
///
/// Returns an error if the MIME builder rejects the input.
pub fn compose(
    message: &EmailMessage,
    from: &str,
    date: DateTime<Utc>,
) -> bizrelay_mime::Result<Vec<u8>> {
    let mut builder = MessageBuilder::new()
        .from(from)
        .subject(message.subject())
        .date(date)
        .text_body(message.body());

    for recipient in message.recipients() {
        builder = builder.to(recipient.as_str());
    }
    if let Some(attachment) = message.attachment() {
        builder = builder.attach(attachment.clone());
    }

    builder.build()
}
