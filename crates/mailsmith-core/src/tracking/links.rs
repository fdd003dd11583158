//! Click-tracking link rewriting.
//!
//! The markup is walked tag by tag. Only the `href` value of `<a>` start
//! tags is replaced; every other byte, including attribute order and
//! quoting, comments and the bodies of `<script>` and `<style>`, is copied
//! through untouched.
//!
//! Before a link target is encoded its character references are resolved:
//! decimal and hex numeric references plus `&amp;`, `&lt;`, `&gt;`,
//! `&quot;` and `&apos;`. Other named references are kept as written.

use url::form_urlencoded;

/// Named references resolved in link targets.
const NAMED_REFERENCES: [(&str, char); 5] = [
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
];

/// Elements whose content is raw text and must not be scanned for tags.
const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "textarea", "title"];

/// Byte range of an attribute value, quotes included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ValueSpan {
    start: usize,
    end: usize,
    quote: Option<char>,
}

/// A parsed start tag.
#[derive(Debug)]
struct StartTag {
    name: String,
    /// Index just past the closing `>`.
    end: usize,
    href: Option<ValueSpan>,
}

/// Builds the jump URL that redirects to `target`.
#[must_use]
pub fn jump_link(jump_url: &str, target: &str) -> String {
    let separator = if jump_url.contains('?') { '&' } else { '?' };
    let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("{jump_url}{separator}target={encoded}")
}

/// Rewrites every anchor `href` in `html` to go through `jump_url`.
///
/// `<a href="http://x">` becomes `<a href="{jump_url}?target=http%3A%2F%2Fx">`.
/// Anchors without `href` and all other elements are left as they are.
#[must_use]
pub fn rewrite_links(html: &str, jump_url: &str) -> String {
    // ASCII lowering keeps byte offsets intact
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len() + 64);
    let mut copied = 0;
    let mut pos = 0;
    let mut rewritten = 0usize;

    while let Some(offset) = html[pos..].find('<') {
        let start = pos + offset;

        if html[start..].starts_with("<!--") {
            pos = html[start..].find("-->").map_or(html.len(), |end| start + end + 3);
            continue;
        }

        let Some(tag) = parse_start_tag(html, start) else {
            pos = start + 1;
            continue;
        };

        if tag.name == "a" {
            if let Some(span) = tag.href {
                let original = unquote(&html[span.start..span.end], span.quote);
                let target = decode_char_refs(original);
                let quote = span.quote.unwrap_or('"');

                out.push_str(&html[copied..span.start]);
                out.push(quote);
                out.push_str(&escape_attribute(&jump_link(jump_url, &target), quote));
                out.push(quote);
                copied = span.end;
                rewritten += 1;
            }
        }

        pos = tag.end;
        if RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) {
            let closing = format!("</{}", tag.name);
            pos = lower[pos..].find(&closing).map_or(html.len(), |end| pos + end);
        }
    }

    out.push_str(&html[copied..]);
    tracing::debug!(rewritten, "rewrote anchor links");
    out
}

fn unquote(value: &str, quote: Option<char>) -> &str {
    match quote {
        Some(_) if value.len() >= 2 => &value[1..value.len() - 1],
        _ => value,
    }
}

/// Resolves character references in an attribute value.
///
/// References must end with `;`. Unknown names and invalid code points
/// are left as written.
fn decode_char_refs(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .and_then(|semi| resolve_reference(&rest[1..semi]).map(|c| (c, semi)));
        if let Some((c, semi)) = decoded {
            out.push(c);
            rest = &rest[semi + 1..];
        } else {
            out.push('&');
            rest = &rest[1..];
        }
    }

    out.push_str(rest);
    out
}

/// Resolves the text between `&` and `;`.
fn resolve_reference(name: &str) -> Option<char> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                u32::from_str_radix(hex, 16).ok()?
            }
            None if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) => {
                number.parse().ok()?
            }
            _ => return None,
        };
        return char::from_u32(code).filter(|&c| c != '\0');
    }
    NAMED_REFERENCES
        .iter()
        .find(|(entity, _)| *entity == name)
        .map(|&(_, c)| c)
}

fn escape_attribute(value: &str, quote: char) -> String {
    let escaped = value.replace('&', "&amp;");
    match quote {
        '\'' => escaped.replace('\'', "&#39;"),
        _ => escaped.replace('"', "&quot;"),
    }
}

/// Parses the start tag opening at `start` (the `<`).
///
/// Returns `None` for end tags, declarations, stray `<` and tags that never
/// close.
fn parse_start_tag(html: &str, start: usize) -> Option<StartTag> {
    let bytes = html.as_bytes();
    let mut i = start + 1;

    if !bytes.get(i)?.is_ascii_alphabetic() {
        return None;
    }
    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    let name = html[name_start..i].to_ascii_lowercase();
    let mut href = None;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i)? {
            b'>' => break,
            b'/' => {
                i += 1;
                continue;
            }
            _ => {}
        }

        let attr_start = i;
        while i < bytes.len() && !matches!(bytes[i], b'=' | b'>' | b'/') && !bytes[i].is_ascii_whitespace()
        {
            i += 1;
        }
        let attr_name = &html[attr_start..i];

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let value_start = i;
        let quote = match bytes.get(i)? {
            q @ (b'"' | b'\'') => Some(char::from(*q)),
            _ => None,
        };
        if let Some(q) = quote {
            let close = html[i + 1..].find(q)?;
            i = i + 1 + close + 1;
        } else {
            while i < bytes.len() && bytes[i] != b'>' && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
        }

        if href.is_none() && attr_name.eq_ignore_ascii_case("href") {
            href = Some(ValueSpan {
                start: value_start,
                end: i,
                quote,
            });
        }
    }

    Some(StartTag {
        name,
        end: i + 1,
        href,
    })
}
