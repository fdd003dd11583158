//! Message body assembly.
//!
//! A message carries zero, one or several renderings of the same content.
//! One rendering is sent as a plain single-part body; several are wrapped
//! in `multipart/alternative` in the order they were added.

use crate::content_type::ContentType;
use rand::Rng;

/// Line terminator used on the wire.
pub const EOL: &str = "\r\n";

/// One rendering of the message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPart {
    /// Full content type, including the charset parameter.
    pub content_type: String,
    /// Content as UTF-8 text.
    pub content: String,
}

impl ContentPart {
    /// Creates a part for `mime` in `charset`.
    ///
    /// A MIME type that does not parse is kept as written with the charset
    /// appended.
    #[must_use]
    pub fn new(mime: &str, content: impl Into<String>, charset: &str) -> Self {
        let content_type = ContentType::parse(mime).map_or_else(
            |_| format!("{mime}; charset={charset}"),
            |ct| ct.with_parameter("charset", charset).to_string(),
        );
        Self {
            content_type,
            content: content.into(),
        }
    }
}

/// Assembled body and the top-level content type it needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Body {
    /// Top-level `Content-Type`; `None` for an empty body.
    pub content_type: Option<String>,
    /// Body text with CRLF line endings.
    pub text: String,
}

impl Body {
    /// Returns `true` if the body has no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns the multipart boundary if the body is multipart.
    #[must_use]
    pub fn boundary(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|ct| ContentType::parse(ct).ok())
            .and_then(|ct| ct.boundary().map(str::to_string))
    }
}

/// Generates a fresh multipart boundary.
///
/// The `=_` prefix cannot occur in Base64 or Quoted-Printable output.
#[must_use]
pub fn generate_boundary() -> String {
    let token: u128 = rand::thread_rng().r#gen();
    format!("=_{token:032x}")
}

/// Assembles `parts` into a body, generating a boundary when needed.
#[must_use]
pub fn assemble<'a>(parts: impl IntoIterator<Item = &'a ContentPart>) -> Body {
    let parts: Vec<&ContentPart> = parts.into_iter().collect();
    if parts.len() < 2 {
        return assemble_parts(&parts, "");
    }
    assemble_parts(&parts, &generate_boundary())
}

/// Assembles `parts` with a caller-chosen boundary.
#[must_use]
pub fn assemble_with_boundary<'a>(
    parts: impl IntoIterator<Item = &'a ContentPart>,
    boundary: &str,
) -> Body {
    let parts: Vec<&ContentPart> = parts.into_iter().collect();
    assemble_parts(&parts, boundary)
}

fn assemble_parts(parts: &[&ContentPart], boundary: &str) -> Body {
    match parts {
        [] => Body::default(),
        [single] => Body {
            content_type: Some(single.content_type.clone()),
            text: format!("{}{EOL}", single.content),
        },
        many => {
            let mut text = String::new();
            for part in many {
                text.push_str(&format!(
                    "--{boundary}{EOL}Content-Type: {}{EOL}{EOL}{}{EOL}{EOL}",
                    part.content_type, part.content
                ));
            }
            text.push_str(&format!("--{boundary}--{EOL}"));

            Body {
                content_type: Some(ContentType::multipart_alternative(boundary).to_string()),
                text,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(mime: &str, content: &str) -> ContentPart {
        ContentPart::new(mime, content, "UTF-8")
    }

    #[test]
    fn test_part_content_type() {
        assert_eq!(part("text/plain", "x").content_type, "text/plain; charset=UTF-8");
        assert_eq!(
            ContentPart::new("text/html; charset=utf-8", "x", "ISO-8859-1").content_type,
            "text/html; charset=ISO-8859-1"
        );
        assert_eq!(part("weird", "x").content_type, "weird; charset=UTF-8");
    }

    #[test]
    fn test_empty_body() {
        let body = assemble(std::iter::empty());
        assert!(body.is_empty());
        assert!(body.content_type.is_none());
    }

    #[test]
    fn test_single_part() {
        let parts = [part("text/plain", "hello")];
        let body = assemble(&parts);
        assert_eq!(body.content_type.as_deref(), Some("text/plain; charset=UTF-8"));
        assert_eq!(body.text, "hello\r\n");
        assert!(body.boundary().is_none());
    }

    #[test]
    fn test_alternative_layout() {
        let parts = [part("text/plain", "hi"), part("text/html", "<b>hi</b>")];
        let body = assemble_with_boundary(&parts, "XYZ");

        assert_eq!(
            body.content_type.as_deref(),
            Some("multipart/alternative; boundary=XYZ")
        );
        assert_eq!(
            body.text,
            concat!(
                "--XYZ\r\n",
                "Content-Type: text/plain; charset=UTF-8\r\n\r\n",
                "hi\r\n\r\n",
                "--XYZ\r\n",
                "Content-Type: text/html; charset=UTF-8\r\n\r\n",
                "<b>hi</b>\r\n\r\n",
                "--XYZ--\r\n"
            )
        );
    }

    #[test]
    fn test_generated_boundary_matches_header() {
        let parts = [part("text/plain", "a"), part("text/html", "b"), part("text/calendar", "c")];
        let body = assemble(&parts);

        let boundary = body.boundary().unwrap_or_default();
        assert!(boundary.starts_with("=_"));
        assert_eq!(body.text.matches(&format!("--{boundary}\r\n")).count(), 3);
        assert!(body.text.ends_with(&format!("--{boundary}--\r\n")));
        assert!(
            body.content_type
                .unwrap_or_default()
                .contains(&format!("boundary=\"{boundary}\""))
        );
    }

    #[test]
    fn test_boundaries_are_unique() {
        assert_ne!(generate_boundary(), generate_boundary());
    }
}
