//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header encoding.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum encoded line length for Base64 and Quoted-Printable (RFC 2045).
pub const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64 (single line).
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(data)
        .map_err(|e| Error::InvalidEncoding(format!("base64: {e}")))
}

/// Cleans an already-encoded Base64 payload supplied by a client.
///
/// Whitespace (including existing line breaks) is removed and the result
/// must decode as standard padded Base64. Returns the cleaned text.
///
/// # Errors
///
/// Returns an error if the payload is empty or not valid Base64.
pub fn normalize_base64(data: &str) -> Result<String> {
    let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(Error::InvalidEncoding("empty base64 payload".into()));
    }

    decode_base64(&cleaned)?;
    Ok(cleaned)
}

/// Wraps a single-line Base64 string into CRLF-separated lines of at most
/// [`MAX_LINE_LENGTH`] characters. No trailing CRLF is appended.
#[must_use]
pub fn wrap_base64(encoded: &str) -> String {
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);
    // Base64 output is ASCII, so byte chunks are char boundaries.
    for (i, chunk) in encoded.as_bytes().chunks(MAX_LINE_LENGTH).enumerate() {
        if i > 0 {
            wrapped.push_str("\r\n");
        }
        wrapped.push_str(&String::from_utf8_lossy(chunk));
    }
    wrapped
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Hard line breaks in the input become CRLF; long lines get soft breaks
/// so that no encoded line exceeds [`MAX_LINE_LENGTH`].
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        let bytes = line.strip_suffix('\r').unwrap_or(line).as_bytes();

        let mut line_length = 0;
        for (j, &byte) in bytes.iter().enumerate() {
            let is_last = j + 1 == bytes.len();
            let literal = match byte {
                b'!'..=b'<' | b'>'..=b'~' => true,
                // Trailing whitespace would be stripped in transit.
                b' ' | b'\t' => !is_last,
                _ => false,
            };
            let width = if literal { 1 } else { 3 };

            // Leave room for the '=' of a soft line break.
            if line_length + width > MAX_LINE_LENGTH - 1 {
                result.push_str("=\r\n");
                line_length = 0;
            }

            if literal {
                result.push(char::from(byte));
            } else {
                let _ = write!(result, "={byte:02X}");
            }
            line_length += width;
        }
    }

    result
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences or the
/// decoded bytes are not UTF-8.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }

        let rest = &bytes[i + 1..];
        if rest.starts_with(b"\r\n") {
            i += 3;
        } else if rest.starts_with(b"\n") {
            i += 2;
        } else {
            let hex = rest
                .get(..2)
                .and_then(|h| std::str::from_utf8(h).ok())
                .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".into()))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
            result.push(byte);
            i += 3;
        }
    }

    String::from_utf8(result).map_err(Into::into)
}

/// Longest encoded word allowed by RFC 2047, delimiters included.
const MAX_ENCODED_WORD: usize = 75;

/// Encodes a header value using RFC 2047 encoding when it is not plain ASCII.
///
/// Format: `=?charset?B?encoded-text?=`. Long values are split on character
/// boundaries into several space-separated words of at most 75 characters.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) && !text.contains("=?") {
        return text.to_string();
    }

    // "=?" + charset + "?B?" + payload + "?="
    let payload = MAX_ENCODED_WORD.saturating_sub(7 + charset.len());
    let max_bytes = (payload / 4 * 3).max(4);

    let mut words = Vec::new();
    let mut chunk_start = 0;
    let mut chunk_len = 0;
    for c in text.chars() {
        if chunk_len + c.len_utf8() > max_bytes {
            words.push(&text[chunk_start..chunk_start + chunk_len]);
            chunk_start += chunk_len;
            chunk_len = 0;
        }
        chunk_len += c.len_utf8();
    }
    words.push(&text[chunk_start..chunk_start + chunk_len]);

    words
        .into_iter()
        .map(|chunk| format!("=?{charset}?B?{}?=", encode_base64(chunk.as_bytes())))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decodes an RFC 2047 encoded header value.
///
/// Text outside encoded words is kept as is; whitespace between two adjacent
/// encoded words is dropped.
///
/// # Errors
///
/// Returns an error if an encoded word is malformed.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut previous_encoded = false;

    for (i, token) in text.split(' ').enumerate() {
        match decode_word(token)? {
            Some(decoded) => {
                if i > 0 && !previous_encoded {
                    out.push(' ');
                }
                out.push_str(&decoded);
                previous_encoded = true;
            }
            None => {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(token);
                previous_encoded = false;
            }
        }
    }

    Ok(out)
}

/// Decodes one `=?charset?enc?text?=` token, or returns `None` for plain text.
fn decode_word(token: &str) -> Result<Option<String>> {
    let Some(inner) = token
        .strip_prefix("=?")
        .and_then(|rest| rest.strip_suffix("?="))
    else {
        return Ok(None);
    };

    let parts: Vec<&str> = inner.split('?').collect();
    let [_charset, encoding, encoded_text] = parts.as_slice() else {
        return Err(Error::InvalidEncoding(
            "Invalid RFC 2047 format".to_string(),
        ));
    };

    let decoded = match encoding.to_uppercase().as_str() {
        "B" => String::from_utf8(decode_base64(encoded_text)?)?,
        "Q" => decode_quoted_printable(&encoded_text.replace('_', " "))?,
        other => {
            return Err(Error::InvalidEncoding(format!(
                "Unknown encoding: {other}"
            )));
        }
    };
    Ok(Some(decoded))
}
