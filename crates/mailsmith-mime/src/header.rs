//! MIME header handling.

use crate::encoding::decode_header;
use crate::error::Result;
use indexmap::IndexMap;
use std::fmt;

/// Header entry: the name as first written plus its values.
#[derive(Debug, Clone)]
struct Entry {
    name: String,
    values: Vec<String>,
}

/// Collection of email headers.
///
/// Lookups are case-insensitive; rendering keeps insertion order and the
/// spelling of the name used when the header was first added.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: IndexMap<String, Entry>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers
            .entry(name.to_lowercase())
            .or_insert_with(|| Entry {
                name,
                values: Vec::new(),
            })
            .values
            .push(value.into());
    }

    /// Sets a header value, replacing any existing values.
    ///
    /// A replaced header keeps its position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.headers.get_mut(&name.to_lowercase()) {
            Some(entry) => entry.values = vec![value],
            None => {
                self.headers.insert(
                    name.to_lowercase(),
                    Entry {
                        name,
                        values: vec![value],
                    },
                );
            }
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|e| e.values.first().map(String::as_str))
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(|e| e.values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Gets the first value for a header with encoded-words decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the value holds a malformed encoded-word.
    pub fn get_decoded(&self, name: &str) -> Result<Option<String>> {
        self.get(name).map(decode_header).transpose()
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_lowercase())
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.headers.shift_remove(&name.to_lowercase());
    }

    /// Returns the number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns `true` if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .values()
            .flat_map(|e| e.values.iter().map(move |v| (e.name.as_str(), v.as_str())))
    }

    /// Parses a header block from raw text.
    ///
    /// Continuation lines (leading space or tab) are unfolded into the
    /// previous header. Parsing stops at the first empty line.
    ///
    /// # Errors
    ///
    /// Returns an error if header format is invalid.
    pub fn parse(text: &str) -> Result<Self> {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value);
            }

            if let Some((name, value)) = line.split_once(':') {
                current = Some((name.trim().to_string(), value.trim().to_string()));
            }
        }

        if let Some((name, value)) = current {
            headers.add(name, value);
        }

        Ok(headers)
    }
}

impl fmt::Display for Headers {
    /// Renders the block with CRLF line endings, without the blank
    /// separator line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_headers_set_keeps_position() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("To", "bob@example.com");
        headers.add("Subject", "Hi");
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("to", "charlie@example.com");
        assert_eq!(headers.get_all("To"), vec!["charlie@example.com"]);
        assert_eq!(headers.to_string(), "To: charlie@example.com\r\nSubject: Hi\r\n");
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        assert!(headers.contains("subject"));

        headers.remove("SUBJECT");
        assert!(headers.get("Subject").is_none());
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: =?UTF-8?B?SMOp?=\r\n",
            " =?UTF-8?B?bGxv?=\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Body: not a header\r\n"
        );

        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get_decoded("Subject").unwrap().as_deref(), Some("Héllo"));
        assert_eq!(headers.get("Content-Type"), Some("text/plain; charset=utf-8"));
        assert!(headers.get("Body").is_none());
    }

    #[test]
    fn test_headers_display_keeps_spelling() {
        let mut headers = Headers::new();
        headers.add("MIME-Version", "1.0");
        headers.add("Reply-To", "<r@example.com>");

        assert_eq!(
            headers.to_string(),
            "MIME-Version: 1.0\r\nReply-To: <r@example.com>\r\n"
        );
    }

    #[test]
    fn test_headers_iter() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("To", "recipient@example.com");

        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["From", "To"]);
    }
}
