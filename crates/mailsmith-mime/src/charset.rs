//! Charset transcoding for header and body text.
//!
//! Outbound text is always held as UTF-8 and converted to the message
//! charset at the last moment. Conversion is best effort: characters the
//! target cannot represent become `?`, and labels `encoding_rs` does not
//! know fall back to a Latin-1 narrowing. Nothing here returns an error.

use encoding_rs::{Encoding, EncoderResult, UTF_8};
use std::borrow::Cow;

/// Byte substituted for characters the target charset cannot represent.
const SUBSTITUTE: u8 = b'?';

/// Returns `true` if the label names UTF-8.
#[must_use]
pub fn is_utf8(charset: &str) -> bool {
    charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("utf8")
}

/// Resolves a charset label to the encoding used for output.
///
/// Encodings that cannot be produced (UTF-16, `replacement`) resolve to
/// UTF-8, matching the WHATWG output-encoding rule.
fn lookup(charset: &str) -> Option<&'static Encoding> {
    Encoding::for_label(charset.trim().as_bytes()).map(Encoding::output_encoding)
}

/// Converts UTF-8 text to `charset`.
///
/// Returns the input bytes unchanged when the target is UTF-8 or the text
/// is empty.
#[must_use]
pub fn transcode<'a>(text: &'a str, charset: &str) -> Cow<'a, [u8]> {
    if text.is_empty() || is_utf8(charset) {
        return Cow::Borrowed(text.as_bytes());
    }

    let out = match lookup(charset) {
        Some(encoding) if encoding == UTF_8 => return Cow::Borrowed(text.as_bytes()),
        Some(encoding) => encode_with(encoding, text),
        None => {
            tracing::debug!(charset, "unknown charset, narrowing to Latin-1");
            narrow_latin1(text)
        }
    };

    if out.is_empty() {
        Cow::Borrowed(text.as_bytes())
    } else {
        Cow::Owned(out)
    }
}

/// Encodes with `encoding_rs`, substituting unmappable characters.
fn encode_with(encoding: &'static Encoding, text: &str) -> Vec<u8> {
    let mut encoder = encoding.new_encoder();
    let capacity = encoder
        .max_buffer_length_from_utf8_without_replacement(text.len())
        .unwrap_or(text.len() * 4)
        .max(16);
    let mut buffer = vec![0u8; capacity];
    let mut out = Vec::with_capacity(text.len());
    let mut src = text;
    let mut substituted = 0usize;

    loop {
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(src, &mut buffer, true);
        out.extend_from_slice(&buffer[..written]);
        src = &src[read..];

        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => {
                let grown = buffer.len() * 2;
                buffer.resize(grown, 0);
            }
            EncoderResult::Unmappable(_) => {
                out.push(SUBSTITUTE);
                substituted += 1;
            }
        }
    }

    if substituted > 0 {
        tracing::debug!(
            charset = encoding.name(),
            substituted,
            "characters not representable in target charset"
        );
    }

    out
}

/// Maps code points up to U+00FF to one byte each, everything else to `?`.
fn narrow_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(SUBSTITUTE))
        .collect()
}

/// Converts bytes in `charset` back to UTF-8.
///
/// Malformed sequences become U+FFFD. Unknown labels are read as Latin-1.
#[must_use]
pub fn decode(bytes: &[u8], charset: &str) -> String {
    if is_utf8(charset) {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    match Encoding::for_label(charset.trim().as_bytes()) {
        Some(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
        None => bytes.iter().copied().map(char::from).collect(),
    }
}
