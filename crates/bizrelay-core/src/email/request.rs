//! Send-email request validation.

use bizrelay_mime::Attachment;
use bizrelay_smtp::Address;
use serde::Deserialize;

/// Validation error for a send-email request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field is absent or blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A field is present but malformed.
    #[error("Invalid field {name}: {reason}")]
    InvalidField {
        /// Wire name of the field.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ValidationError {
    /// Get the wire name of the field this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::MissingField(name) | Self::InvalidField { name, .. } => *name,
        }
    }

    /// Get a caller-safe message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "Missing required field",
            Self::InvalidField { .. } => "Invalid field",
        }
    }
}

/// Inbound send-email payload as decoded from JSON.
///
/// Every field is optional on the wire so that an absent field and an empty
/// one are reported the same way.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendEmailRequest {
    /// Comma-separated recipient list.
    pub to: Option<String>,
    /// Subject line.
    pub subject: Option<String>,
    /// Plain-text body.
    pub body: Option<String>,
    /// Attachment filename.
    pub attachment_name: Option<String>,
    /// Attachment content, Base64 (optionally as a `data:` URL).
    pub attachment_data: Option<String>,
}

impl SendEmailRequest {
    /// Validates the request.
    ///
    /// Fields are checked in order `to`, `subject`, `body`, then the
    /// attachment pair; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] for the first absent field,
    /// or [`ValidationError::InvalidField`] for a bad address or attachment.
    pub fn validate(self) -> Result<EmailMessage, ValidationError> {
        let to = required(self.to, "to")?;
        let subject = required(self.subject, "subject")?;
        let body = required(self.body, "body")?;

        let recipients = parse_recipients(&to)?;

        let attachment = match (present(self.attachment_name), present(self.attachment_data)) {
            (None, None) => None,
            (Some(_), None) => return Err(ValidationError::MissingField("attachment_data")),
            (None, Some(_)) => return Err(ValidationError::MissingField("attachment_name")),
            (Some(name), Some(data)) => Some(Attachment::from_base64(&name, &data).map_err(
                |e| ValidationError::InvalidField {
                    name: "attachment_data",
                    reason: e.to_string(),
                },
            )?),
        };

        Ok(EmailMessage {
            recipients,
            subject,
            body,
            attachment,
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ValidationError> {
    present(value).ok_or(ValidationError::MissingField(name))
}

fn parse_recipients(to: &str) -> Result<Vec<Address>, ValidationError> {
    let recipients = to
        .split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(|addr| {
            if !is_valid_mailbox(addr) {
                return Err(ValidationError::InvalidField {
                    name: "to",
                    reason: format!("invalid address {addr:?}"),
                });
            }
            Address::new(addr).map_err(|e| ValidationError::InvalidField {
                name: "to",
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if recipients.is_empty() {
        return Err(ValidationError::InvalidField {
            name: "to",
            reason: "no recipient address".into(),
        });
    }
    Ok(recipients)
}

/// Exactly one `@` with non-empty local and domain parts.
fn is_valid_mailbox(addr: &str) -> bool {
    let mut parts = addr.split('@');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
    )
}

/// A validated outbound email.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    recipients: Vec<Address>,
    subject: String,
    body: String,
    attachment: Option<Attachment>,
}

impl EmailMessage {
    /// Returns the recipients, in request order. Never empty.
    #[must_use]
    pub fn recipients(&self) -> &[Address] {
        &self.recipients
    }

    /// Returns the subject line.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the plain-text body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the attachment, if any.
    #[must_use]
    pub const fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }
}
