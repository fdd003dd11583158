//! Transport collaborator.
//!
//! The mailer never speaks SMTP itself. It sets headers on a [`Transport`],
//! hands over the encoded body and reads back the session transcript.
//! [`SimulatedTransport`] is an in-process implementation that renders the
//! full message and records an SMTP-shaped dialogue without opening a
//! socket; it backs mock sends, previews and tests.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::Utc;
use mailsmith_mime::encoding::encode_base64_wrapped;
use mailsmith_mime::body::generate_boundary;
use mailsmith_mime::{ContentType, Headers, extract_addresses};
use rand::Rng;

use crate::config::SmtpConfig;
use crate::error::Result;

/// How much of the session ends up in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Server replies only.
    Quiet,
    /// Server replies and client commands.
    Commands,
    /// Everything, including the message sent after `DATA`.
    #[default]
    Verbose,
}

/// File attachment reference.
///
/// Only metadata; the transport reads the bytes when it sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Path of the file to attach.
    pub path: PathBuf,
    /// File name shown to the recipient, defaults to the path's file name.
    pub alias: Option<String>,
    /// Content-ID for inline references (`cid:`).
    pub content_id: Option<String>,
}

impl Attachment {
    /// Creates an attachment for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            alias: None,
            content_id: None,
        }
    }

    /// Sets the file name shown to the recipient.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the Content-ID.
    #[must_use]
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// File name shown to the recipient.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.alias.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map_or_else(String::new, |name| name.to_string_lossy().into_owned())
        })
    }
}

/// Mail transport session.
pub trait Transport {
    /// Opens a fresh session for `config`.
    fn open(config: &SmtpConfig) -> Self
    where
        Self: Sized;

    /// Sets a header, replacing a previous value.
    fn set(&mut self, name: &str, value: &str);

    /// Removes a header.
    fn clear(&mut self, name: &str);

    /// Queues an attachment.
    fn attach(&mut self, attachment: Attachment);

    /// Sends the message with `body` as its encoded body.
    ///
    /// Returns `true` if the server accepted the message.
    fn send(&mut self, body: &[u8], log_level: LogLevel, mock: bool) -> bool;

    /// Returns the session transcript, one line per `\n`.
    fn log(&self) -> String;
}

/// Transport that renders messages and logs a simulated SMTP session.
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    host: String,
    headers: Headers,
    attachments: Vec<Attachment>,
    transcript: String,
    rejection: Option<(u16, String)>,
    last_message: Option<Vec<u8>>,
    delivered: Vec<Vec<u8>>,
}

impl SimulatedTransport {
    /// Makes every following transaction fail at `MAIL FROM` with this reply.
    pub fn reject_with(&mut self, code: u16, text: impl Into<String>) {
        self.rejection = Some((code, text.into()));
    }

    /// Headers currently set on the session.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Attachments queued on the session.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// The last message rendered by [`Transport::send`], mock or not.
    #[must_use]
    pub fn last_message(&self) -> Option<&[u8]> {
        self.last_message.as_deref()
    }

    /// Parses the header block of the last rendered message.
    ///
    /// # Errors
    ///
    /// Returns an error if the header block cannot be parsed.
    pub fn last_message_headers(&self) -> Result<Option<Headers>> {
        let Some(message) = self.last_message() else {
            return Ok(None);
        };
        let text = String::from_utf8_lossy(message);
        Ok(Some(Headers::parse(&text)?))
    }

    /// Messages accepted by non-mock sends.
    #[must_use]
    pub fn delivered(&self) -> &[Vec<u8>] {
        &self.delivered
    }

    fn reply(&mut self, line: &str) {
        self.transcript.push_str(line);
        self.transcript.push('\n');
    }

    fn command(&mut self, level: LogLevel, line: &str) {
        if level != LogLevel::Quiet {
            self.reply(line);
        }
    }

    /// Envelope sender: the bounce address if set, else the From address.
    fn envelope_sender(&self) -> String {
        ["Sender", "From"]
            .iter()
            .filter_map(|name| self.headers.get(name))
            .flat_map(extract_addresses)
            .next()
            .unwrap_or_default()
    }

    fn envelope_recipients(&self) -> Vec<String> {
        ["To", "Cc", "Bcc"]
            .iter()
            .filter_map(|name| self.headers.get(name))
            .flat_map(extract_addresses)
            .collect()
    }

    /// Renders header block and body, wrapping attachments in
    /// `multipart/mixed`.
    fn render(&self, body: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut headers = self.headers.clone();
        headers.remove("Bcc");
        if !headers.contains("Date") {
            headers.set("Date", Utc::now().to_rfc2822());
        }
        if !headers.contains("Message-ID") {
            let token: u64 = rand::thread_rng().r#gen();
            headers.set("Message-ID", format!("<{token:016x}@{}>", self.host));
        }
        if !headers.contains("MIME-Version") {
            headers.set("MIME-Version", "1.0");
        }

        if self.attachments.is_empty() {
            let mut message = headers.to_string().into_bytes();
            message.extend_from_slice(b"\r\n");
            message.extend_from_slice(body);
            return Ok(message);
        }

        let boundary = generate_boundary();
        let inner_type = headers
            .get("Content-Type")
            .unwrap_or("text/plain")
            .to_string();
        headers.set(
            "Content-Type",
            ContentType::multipart_mixed(boundary.as_str()).to_string(),
        );

        let mut message = headers.to_string().into_bytes();
        message.extend_from_slice(b"\r\n");
        message.extend_from_slice(
            format!("--{boundary}\r\nContent-Type: {inner_type}\r\n\r\n").as_bytes(),
        );
        message.extend_from_slice(body);
        message.extend_from_slice(b"\r\n");

        for attachment in &self.attachments {
            let data = std::fs::read(&attachment.path)?;
            let name = attachment.file_name();
            let mut part = String::new();
            let _ = write!(part, "--{boundary}\r\n");
            let _ = write!(part, "Content-Type: application/octet-stream; name=\"{name}\"\r\n");
            part.push_str("Content-Transfer-Encoding: base64\r\n");
            let _ = write!(part, "Content-Disposition: attachment; filename=\"{name}\"\r\n");
            if let Some(cid) = &attachment.content_id {
                let _ = write!(part, "Content-ID: <{}>\r\n", cid.trim_matches(['<', '>']));
            }
            part.push_str("\r\n");
            part.push_str(&encode_base64_wrapped(&data, 76));
            message.extend_from_slice(part.as_bytes());
        }
        message.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        Ok(message)
    }

    fn quit(&mut self, level: LogLevel) {
        self.command(level, "QUIT");
        self.reply("221 Bye");
    }
}

impl Transport for SimulatedTransport {
    fn open(config: &SmtpConfig) -> Self {
        let mut transport = Self {
            host: config.host.clone(),
            headers: Headers::new(),
            attachments: Vec::new(),
            transcript: String::new(),
            rejection: None,
            last_message: None,
            delivered: Vec::new(),
        };
        let greeting = format!("220 {} ESMTP simulated", config.host);
        transport.reply(&greeting);
        transport
    }

    fn set(&mut self, name: &str, value: &str) {
        self.headers.set(name, value);
    }

    fn clear(&mut self, name: &str) {
        self.headers.remove(name);
    }

    fn attach(&mut self, attachment: Attachment) {
        tracing::debug!(path = %attachment.path.display(), "attachment queued");
        self.attachments.push(attachment);
    }

    fn send(&mut self, body: &[u8], log_level: LogLevel, mock: bool) -> bool {
        let message = match self.render(body) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(?e, "failed to read attachment");
                self.reply(&format!("554 Attachment not readable: {e}"));
                return false;
            }
        };
        self.last_message = Some(message.clone());

        let host = self.host.clone();
        self.command(log_level, "EHLO localhost");
        self.reply(&format!("250 {host}"));

        let sender = self.envelope_sender();
        self.command(log_level, &format!("MAIL FROM: <{sender}>"));
        if let Some((code, text)) = self.rejection.clone() {
            tracing::warn!(code, text = %text, "transaction rejected");
            self.reply(&format!("{code} {text}"));
            self.quit(log_level);
            return false;
        }
        self.reply("250 OK");

        let recipients = self.envelope_recipients();
        for recipient in &recipients {
            self.command(log_level, &format!("RCPT TO: <{recipient}>"));
            self.reply("250 OK");
        }
        if recipients.is_empty() {
            self.command(log_level, "DATA");
            self.reply("554 No valid recipients");
            self.quit(log_level);
            return false;
        }

        self.command(log_level, "DATA");
        self.reply("354 Start mail input; end with <CRLF>.<CRLF>");
        if log_level == LogLevel::Verbose {
            let text = String::from_utf8_lossy(&message).into_owned();
            let text = text.strip_suffix("\r\n").unwrap_or(&text);
            for line in text.split("\r\n") {
                self.reply(line);
            }
        }
        self.reply("250 OK queued");
        self.quit(log_level);

        tracing::debug!(mock, bytes = message.len(), "message accepted");
        if !mock {
            self.delivered.push(message);
        }
        true
    }

    fn log(&self) -> String {
        self.transcript.clone()
    }
}
