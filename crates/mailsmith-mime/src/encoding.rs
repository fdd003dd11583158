//! MIME encoding and decoding utilities.
//!
//! Base64 helpers plus RFC 2047 header encoding. Encoded header values are
//! split into `B` encoded-words that each fit on one folded header line and
//! each decode on their own, because chunks are cut on character
//! boundaries and transcoded separately.

use crate::charset::{self, transcode};
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Maximum length of one physical header line produced by [`encode_header`],
/// including the folding whitespace.
///
/// Charset labels longer than 59 characters leave no room for a
/// payload; such words carry a fixed 8-character payload and overrun this
/// limit.
pub const MAX_LINE_LENGTH: usize = 75;

/// Separator between folded header lines.
pub const FOLD: &str = "\r\n ";

/// Closing delimiter of an encoded-word.
const WORD_SUFFIX: &str = "?=";

/// Base64 output for the widest single character we may have to emit.
/// Used as the payload budget when the charset label eats the whole line.
const MIN_PAYLOAD: usize = 8;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 split into CRLF-terminated lines of `width`.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8], width: usize) -> String {
    let encoded = encode_base64(data);
    let width = width.max(4);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / width * 2 + 2);
    for line in encoded.as_bytes().chunks(width) {
        // Base64 output is ASCII
        out.push_str(&String::from_utf8_lossy(line));
        out.push_str("\r\n");
    }
    out
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Decodes Quoted-Printable text (RFC 2045) to raw bytes.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }

        // Soft line break
        let rest = &bytes[i + 1..];
        if rest.starts_with(b"\r\n") {
            i += 3;
            continue;
        }
        if rest.starts_with(b"\n") {
            i += 2;
            continue;
        }

        let hex = bytes
            .get(i + 1..i + 3)
            .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".to_string()))?;
        let hex = std::str::from_utf8(hex)
            .map_err(|_| Error::InvalidEncoding("Invalid hex".to_string()))?;
        let byte = u8::from_str_radix(hex, 16)
            .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
        result.push(byte);
        i += 3;
    }

    Ok(result)
}

/// Returns `true` if a header value can be sent without encoding.
///
/// That is printable ASCII, no encoded-word opener, and short enough for a
/// single line.
#[must_use]
pub fn is_header_safe(text: &str) -> bool {
    text.len() <= MAX_LINE_LENGTH
        && text.bytes().all(|b| (0x20..=0x7e).contains(&b))
        && !text.contains("=?")
}

/// Encodes a header value for transport.
///
/// Header-safe text (see [`is_header_safe`]) is returned unchanged.
/// Anything else becomes one or more `B` encoded-words in `charset`, joined
/// with [`FOLD`]. Every physical line stays within [`MAX_LINE_LENGTH`],
/// unless `charset` is so long that a word with a minimal payload cannot
/// fit (see [`encode_words`]).
#[must_use]
pub fn encode_header(text: &str, charset: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    if is_header_safe(text) {
        return text.to_string();
    }
    encode_words(text, charset).join(FOLD)
}

/// Splits `text` into RFC 2047 `B` encoded-words.
///
/// The chunk size starts from an estimate based on the ratio of characters
/// to transcoded bytes, then grows or shrinks one character at a time until
/// the Base64 payload is as large as fits the line budget. Chunks always
/// end on a character boundary.
///
/// If the `=?charset?B?` prefix alone leaves fewer than 8 payload
/// characters on the line, the budget is pinned at 8 and the words are
/// longer than [`MAX_LINE_LENGTH`]. They still decode one by one.
#[must_use]
pub fn encode_words(text: &str, charset: &str) -> Vec<String> {
    let prefix = format!("=?{charset}?B?");
    let budget = MAX_LINE_LENGTH
        .saturating_sub(1 + prefix.len() + WORD_SUFFIX.len())
        .max(MIN_PAYLOAD);

    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = bounds.len() - 1;
    if char_count == 0 {
        return Vec::new();
    }

    let byte_count = transcode(text, charset).len().max(1);
    let average = (budget * char_count * 3 / (byte_count * 4)).max(1);

    let payload_for = |start: usize, take: usize| {
        let chunk = &text[bounds[start]..bounds[start + take]];
        encode_base64(&transcode(chunk, charset))
    };

    let mut words = Vec::new();
    let mut start = 0;
    while start < char_count {
        let remaining = char_count - start;
        let mut take = average.min(remaining);
        let mut payload = payload_for(start, take);

        if payload.len() <= budget {
            while take < remaining {
                let wider = payload_for(start, take + 1);
                if wider.len() > budget {
                    break;
                }
                take += 1;
                payload = wider;
            }
        } else {
            while payload.len() > budget && take > 1 {
                take -= 1;
                payload = payload_for(start, take);
            }
        }

        words.push(format!("{prefix}{payload}{WORD_SUFFIX}"));
        start += take;
    }

    tracing::trace!(charset, words = words.len(), "encoded header value");
    words
}

/// Decodes a single RFC 2047 encoded-word.
///
/// Format: `=?charset?encoding?encoded-text?=`. Input that is not wrapped
/// in `=?` / `?=` is returned as-is.
///
/// # Errors
///
/// Returns an error if the input is not valid RFC 2047 format.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    if !looks_encoded(text) {
        return Ok(text.to_string());
    }

    let inner = &text[2..text.len() - 2];
    let parts: Vec<&str> = inner.splitn(3, '?').collect();

    let [charset, encoding, encoded_text] = parts.as_slice() else {
        return Err(Error::InvalidEncoding(
            "Invalid RFC 2047 format".to_string(),
        ));
    };

    let bytes = match encoding.to_ascii_uppercase().as_str() {
        "B" => decode_base64(encoded_text)?,
        // Quoted-Printable with underscore for space
        "Q" => decode_quoted_printable(&encoded_text.replace('_', " "))?,
        other => {
            return Err(Error::InvalidEncoding(format!("Unknown encoding: {other}")));
        }
    };

    // RFC 2231 language suffix, e.g. `utf-8*en`
    let charset = charset.split('*').next().unwrap_or_default();
    Ok(charset::decode(&bytes, charset))
}

fn looks_encoded(token: &str) -> bool {
    token.len() > 4
        && token.starts_with("=?")
        && token.ends_with("?=")
        && token[2..token.len() - 2].matches('?').count() == 2
}

/// Decodes a complete header value.
///
/// Folded lines are unfolded, every encoded-word is decoded with its own
/// charset and whitespace between adjacent encoded-words is dropped, as
/// RFC 2047 section 6.2 requires. Plain text is kept verbatim.
///
/// # Errors
///
/// Returns an error if an encoded-word is malformed.
pub fn decode_header(value: &str) -> Result<String> {
    let unfolded = value.replace("\r\n", "").replace('\n', "");
    let mut out = String::with_capacity(unfolded.len());
    let mut whitespace = String::new();
    let mut last_was_word = false;

    for (is_space, token) in split_whitespace_runs(&unfolded) {
        if is_space {
            whitespace.push_str(token);
            continue;
        }

        let is_word = looks_encoded(token);
        if !(is_word && last_was_word) {
            out.push_str(&whitespace);
        }
        whitespace.clear();

        if is_word {
            out.push_str(&decode_rfc2047(token)?);
        } else {
            out.push_str(token);
        }
        last_was_word = is_word;
    }
    out.push_str(&whitespace);

    Ok(out)
}

/// Splits text into alternating runs of whitespace and non-whitespace.
fn split_whitespace_runs(text: &str) -> Vec<(bool, &str)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;

    for (i, c) in text.char_indices() {
        let is_space = c == ' ' || c == '\t';
        match current {
            Some(kind) if kind == is_space => {}
            Some(kind) => {
                runs.push((kind, &text[start..i]));
                start = i;
                current = Some(is_space);
            }
            None => current = Some(is_space),
        }
    }
    if let Some(kind) = current {
        runs.push((kind, &text[start..]));
    }

    runs
}
