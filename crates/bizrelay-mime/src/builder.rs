//! multipart/mixed message composition.

use crate::content_type::ContentType;
use crate::encoding::{encode_quoted_printable, encode_rfc2047, normalize_base64, wrap_base64};
use crate::error::{Error, Result};
use crate::header::{Headers, sanitize_value};
use crate::message::TransferEncoding;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;

const BOUNDARY_PREFIX: &str = "----=_Part_";
const BOUNDARY_RANDOM_LEN: usize = 24;

/// Generates a fresh multipart boundary token.
#[must_use]
pub fn generate_boundary() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{BOUNDARY_PREFIX}{suffix}")
}

/// A file attachment carried as already-encoded Base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    content_type: ContentType,
    data: String,
}

impl Attachment {
    /// Creates an attachment from a client-supplied Base64 payload.
    ///
    /// The payload may be a `data:<type>;base64,` URL, in which case the
    /// declared type is used. Otherwise the type is inferred from the
    /// filename extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEncoding`] if the payload is not valid Base64.
    pub fn from_base64(filename: &str, data: &str) -> Result<Self> {
        let filename = sanitize_filename(filename);

        let (declared, payload) = match data.trim_start().strip_prefix("data:") {
            Some(url) => {
                let (meta, payload) = url
                    .split_once(',')
                    .ok_or_else(|| Error::InvalidEncoding("malformed data URL".into()))?;
                let media_type = meta
                    .strip_suffix(";base64")
                    .ok_or_else(|| Error::InvalidEncoding("data URL is not base64".into()))?;
                (ContentType::parse(media_type).ok(), payload)
            }
            None => (None, data),
        };

        let data = normalize_base64(payload)?;
        let content_type = declared.unwrap_or_else(|| ContentType::from_filename(&filename));

        Ok(Self {
            filename,
            content_type,
            data,
        })
    }

    /// Returns the sanitized filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the attachment content type.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Returns the normalized single-line Base64 payload.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }
}

/// Strips characters that could break out of a quoted header parameter.
fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = sanitize_value(filename)
        .chars()
        .filter(|c| !matches!(c, '"' | '\\') && !c.is_control())
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Builder for a multipart/mixed message with one text part and optional
/// attachments.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Vec<String>,
    subject: String,
    date: Option<DateTime<Utc>>,
    text: String,
    attachments: Vec<Attachment>,
    boundary: Option<String>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the From address.
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Adds a To recipient.
    #[must_use]
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to.push(to.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the Date header. Defaults to the current time.
    #[must_use]
    pub const fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Overrides the generated multipart boundary.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Builds the header block in its fixed emission order.
    fn headers(&self, from: &str, boundary: &str) -> Headers {
        let date = self.date.unwrap_or_else(Utc::now);

        let mut headers = Headers::new();
        headers.add("From", from);
        headers.add("To", self.to.join(", "));
        headers.add("Subject", encode_rfc2047(&self.subject, "utf-8"));
        headers.add("Date", date.to_rfc2822());
        headers.add("MIME-Version", "1.0");
        headers.add(
            "Content-Type",
            ContentType::multipart_mixed(boundary).to_string(),
        );
        headers
    }

    /// Composes the message into CRLF-terminated bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingHeader`] if no sender or recipient was set.
    pub fn build(self) -> Result<Vec<u8>> {
        let from = self
            .from
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| Error::MissingHeader("From"))?;
        if self.to.is_empty() {
            return Err(Error::MissingHeader("To"));
        }

        let boundary = self.boundary.clone().unwrap_or_else(generate_boundary);
        let mut out = self.headers(from, &boundary).to_string();
        out.push_str("\r\n");

        let encoding = TransferEncoding::for_text(&self.text);
        let mut text_headers = Headers::new();
        text_headers.add("Content-Type", ContentType::text_plain().to_string());
        text_headers.add("Content-Transfer-Encoding", encoding.to_string());

        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str(&text_headers.to_string());
        out.push_str("\r\n");
        match encoding {
            TransferEncoding::QuotedPrintable => {
                out.push_str(&encode_quoted_printable(&self.text));
            }
            _ => out.push_str(&self.text.replace("\r\n", "\n").replace('\n', "\r\n")),
        }
        out.push_str("\r\n");

        for attachment in &self.attachments {
            let filename = encode_rfc2047(&attachment.filename, "utf-8");
            let content_type = attachment
                .content_type
                .clone()
                .with_parameter("name", filename.clone());

            let mut part_headers = Headers::new();
            part_headers.add("Content-Type", content_type.to_string());
            part_headers.add("Content-Transfer-Encoding", TransferEncoding::Base64.to_string());
            part_headers.add(
                "Content-Disposition",
                format!("attachment; filename=\"{filename}\""),
            );

            out.push_str(&format!("--{boundary}\r\n"));
            out.push_str(&part_headers.to_string());
            out.push_str("\r\n");
            out.push_str(&wrap_base64(&attachment.data));
            out.push_str("\r\n");
        }

        out.push_str(&format!("--{boundary}--\r\n"));
        Ok(out.into_bytes())
    }
}
