//! Mailbox formatting for address headers.
//!
//! Addresses are not validated: whatever the caller passes ends up between
//! the angle brackets. Checking them is the transport's business.

use crate::encoding::{encode_header, is_header_safe};
use std::fmt;

/// Mailbox (optional display name + address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Email address.
    pub email: String,
    /// Display name (optional).
    pub title: Option<String>,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            title: None,
        }
    }

    /// Creates a new mailbox with a display name and address.
    #[must_use]
    pub fn with_title(email: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            title: Some(title.into()),
        }
    }

    /// Renders the mailbox for a header in `charset`.
    #[must_use]
    pub fn render(&self, charset: &str) -> String {
        format_mailbox(&self.email, self.title.as_deref(), charset)
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render("UTF-8"))
    }
}

/// Formats `email` and an optional display name as a header mailbox.
///
/// - no title: `<email>`
/// - header-safe title: `"title" <email>`
/// - anything else: `=?charset?B?...?= <email>`
#[must_use]
pub fn format_mailbox(email: &str, title: Option<&str>, charset: &str) -> String {
    match title.filter(|t| !t.is_empty()) {
        None => format!("<{email}>"),
        Some(title) if is_header_safe(title) => {
            let escaped = title.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{escaped}\" <{email}>")
        }
        Some(title) => format!("{} <{email}>", encode_header(title, charset)),
    }
}

/// Returns every address found between angle brackets in a header value.
///
/// Works on mailbox lists produced by [`format_mailbox`].
#[must_use]
pub fn extract_addresses(value: &str) -> Vec<String> {
    let mut addresses = Vec::new();
    let mut rest = value;

    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('>') else {
            break;
        };
        let address = after[..close].trim();
        if !address.is_empty() {
            addresses.push(address.to_string());
        }
        rest = &after[close + 1..];
    }

    addresses
}
