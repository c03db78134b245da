//! MIME message structure and parsing.

use crate::content_type::ContentType;
use crate::encoding::{decode_base64, decode_quoted_printable, decode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" | "binary" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            _ => Self::SevenBit,
        }
    }

    /// Picks the encoding for a text body: 7bit when it is plain ASCII with
    /// short lines, Quoted-Printable otherwise.
    #[must_use]
    pub fn for_text(text: &str) -> Self {
        // RFC 5322 hard limit, excluding CRLF.
        let fits = text.lines().all(|line| line.len() <= 998);
        if text.is_ascii() && fits {
            Self::SevenBit
        } else {
            Self::QuotedPrintable
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// MIME message part.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body as transmitted (still transfer-encoded).
    pub body: Vec<u8>,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self { headers, body }
    }

    /// Gets the content type, defaulting to `text/plain`.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        decode_transfer(&self.body, self.transfer_encoding())
    }

    /// Gets the decoded body as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or UTF-8 conversion fails.
    pub fn body_text(&self) -> Result<String> {
        String::from_utf8(self.decode_body()?).map_err(Into::into)
    }

    /// Returns true if the part is declared as an attachment.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.headers
            .get("content-disposition")
            .is_some_and(|d| {
                d.split(';')
                    .next()
                    .is_some_and(|kind| kind.trim().eq_ignore_ascii_case("attachment"))
            })
    }

    /// Returns the attachment filename, decoded from RFC 2047 if needed.
    ///
    /// Looks at `Content-Disposition: ...; filename=` first, then the
    /// `name` parameter of the content type.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        let raw = self
            .headers
            .get("content-disposition")
            .and_then(|d| header_parameter(d, "filename"))
            .or_else(|| {
                self.headers
                    .get("content-type")
                    .and_then(|ct| header_parameter(ct, "name"))
            })?;

        Some(decode_rfc2047(&raw).unwrap_or(raw))
    }
}

/// MIME message.
#[derive(Debug, Clone)]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    /// Message parts (empty for single-part messages).
    pub parts: Vec<Part>,
    /// Body for single-part messages.
    pub body: Option<Vec<u8>>,
}

impl Message {
    /// Creates a single-part message.
    #[must_use]
    pub const fn single_part(headers: Headers, body: Vec<u8>) -> Self {
        Self {
            headers,
            parts: Vec::new(),
            body: Some(body),
        }
    }

    /// Creates a multipart message.
    #[must_use]
    pub const fn multipart(headers: Headers, parts: Vec<Part>) -> Self {
        Self {
            headers,
            parts,
            body: None,
        }
    }

    /// Parses a raw RFC 5322 message.
    ///
    /// Multipart bodies are split on their boundary; the closing delimiter
    /// (`--boundary--`) must be present.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type is malformed, a multipart
    /// message has no boundary, or the multipart structure is incomplete.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.replace("\r\n", "\n");
        let (head, body) = raw.split_once("\n\n").unwrap_or((raw.as_str(), ""));
        let headers = Headers::parse(head)?;

        let content_type = headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)?;

        if !content_type.is_multipart() {
            return Ok(Self::single_part(headers, body.replace('\n', "\r\n").into_bytes()));
        }

        let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
        let parts = split_multipart(body, boundary)?;
        Ok(Self::multipart(headers, parts))
    }

    /// Gets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the From header.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.headers.get("from")
    }

    /// Gets the To header.
    #[must_use]
    pub fn to(&self) -> Option<&str> {
        self.headers.get("to")
    }

    /// Gets the Subject header, decoded from RFC 2047 if needed.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.headers
            .get("subject")
            .map(|s| decode_rfc2047(s).unwrap_or_else(|_| s.to_string()))
    }

    /// Gets the Date header.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.headers.get("date")
    }

    /// Finds the first text/plain part (or the body of a single-part text message).
    ///
    /// # Errors
    ///
    /// Returns an error if no text part is found or decoding fails.
    pub fn text_part(&self) -> Result<String> {
        if let Some(body) = &self.body {
            let encoding = self
                .headers
                .get("content-transfer-encoding")
                .map_or(TransferEncoding::SevenBit, TransferEncoding::parse);
            return String::from_utf8(decode_transfer(body, encoding)?).map_err(Into::into);
        }

        for part in &self.parts {
            let ct = part.content_type()?;
            if ct.essence() == "text/plain" && !part.is_attachment() {
                return part.body_text();
            }
        }

        Err(Error::NoTextPart)
    }

    /// Returns the parts declared as attachments.
    pub fn attachments(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|p| p.is_attachment())
    }
}

fn decode_transfer(body: &[u8], encoding: TransferEncoding) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Base64 => {
            let cleaned: String = String::from_utf8_lossy(body)
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            decode_base64(&cleaned)
        }
        TransferEncoding::QuotedPrintable => {
            Ok(decode_quoted_printable(&String::from_utf8_lossy(body))?.into_bytes())
        }
        TransferEncoding::SevenBit | TransferEncoding::EightBit => Ok(body.to_vec()),
    }
}

/// Splits an LF-normalized multipart body into parts.
fn split_multipart(body: &str, boundary: &str) -> Result<Vec<Part>> {
    let delimiter = format!("--{boundary}");
    let closing = format!("--{boundary}--");

    let mut parts = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    let mut closed = false;

    for line in body.split('\n') {
        let line_trimmed = line.trim_end();
        if line_trimmed == closing {
            if let Some(lines) = current.take() {
                parts.push(parse_part(&lines)?);
            }
            closed = true;
            break;
        }
        if line_trimmed == delimiter {
            if let Some(lines) = current.take() {
                parts.push(parse_part(&lines)?);
            }
            current = Some(Vec::new());
            continue;
        }
        // Lines before the first delimiter are the preamble.
        if let Some(lines) = current.as_mut() {
            lines.push(line);
        }
    }

    if !closed {
        return Err(Error::InvalidMultipart(
            "missing closing boundary".to_string(),
        ));
    }
    if parts.is_empty() {
        return Err(Error::InvalidMultipart("no parts".to_string()));
    }

    Ok(parts)
}

fn parse_part(lines: &[&str]) -> Result<Part> {
    let split = lines
        .iter()
        .position(|l| l.is_empty())
        .unwrap_or(lines.len());

    let headers = Headers::parse(&lines[..split].join("\n"))?;
    let body = lines.get(split + 1..).unwrap_or_default().join("\r\n");

    Ok(Part::new(headers, body.into_bytes()))
}

/// Extracts a `key=value` parameter from a structured header value.
fn header_parameter(value: &str, key: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (k, v) = param.trim().split_once('=')?;
        k.trim()
            .eq_ignore_ascii_case(key)
            .then(|| v.trim().trim_matches('"').to_string())
    })
}
