//! Message composition and sending.
//!
//! A [`Mailer`] collects recipients, content parts and attachments for one
//! outbound email, renders the headers and body in its charset and hands
//! them to a [`Transport`]. Afterwards the session transcript can be read
//! back or archived as an `.eml` file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use mailsmith_mime::encoding::encode_header;
use mailsmith_mime::{ContentPart, body, charset, format_mailbox};

use crate::config::MailerConfig;
use crate::error::{Error, Result};
use crate::tracking::rewrite_links;
use crate::transcript;
use crate::transport::{Attachment, LogLevel, Transport};

/// Recipient role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Primary recipients.
    To,
    /// Carbon copy.
    Cc,
    /// Blind carbon copy.
    Bcc,
}

impl Role {
    /// All roles, in header order.
    pub const ALL: [Self; 3] = [Self::To, Self::Cc, Self::Bcc];

    /// Header the role's recipients are written to.
    #[must_use]
    pub const fn header_name(self) -> &'static str {
        match self {
            Self::To => "To",
            Self::Cc => "Cc",
            Self::Bcc => "Bcc",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_name())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.header_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownRole(s.to_string()))
    }
}

/// Outcome of [`Mailer::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    /// Whether the transport accepted the message.
    pub success: bool,
    /// Whether [`Mailer::save`] would write a file: the send was logged at
    /// [`LogLevel::Verbose`] and the transcript holds the transmitted
    /// message.
    pub transcript_available: bool,
}

type FailureHook<T> = Box<dyn Fn(&Mailer<T>, &str) + Send + Sync>;

/// Composer for one outbound email.
pub struct Mailer<T: Transport> {
    config: MailerConfig,
    charset: String,
    transport: T,
    recipients: IndexMap<Role, IndexMap<String, Option<String>>>,
    parts: IndexMap<String, ContentPart>,
    last_log_level: Option<LogLevel>,
    on_failure: Option<FailureHook<T>>,
}

impl<T: Transport + fmt::Debug> fmt::Debug for Mailer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailer")
            .field("charset", &self.charset)
            .field("transport", &self.transport)
            .field("recipients", &self.recipients)
            .field("parts", &self.parts.keys().collect::<Vec<_>>())
            .field("on_failure", &self.on_failure.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Mailer<T> {
    /// Creates a mailer using the configured charset.
    #[must_use]
    pub fn new(config: MailerConfig) -> Self {
        let charset = config.charset.clone();
        Self::with_charset(config, charset)
    }

    /// Creates a mailer sending in `charset`, overriding the configuration.
    #[must_use]
    pub fn with_charset(config: MailerConfig, charset: impl Into<String>) -> Self {
        let transport = T::open(&config.smtp);
        let mut mailer = Self {
            config,
            charset: charset.into(),
            transport,
            recipients: IndexMap::new(),
            parts: IndexMap::new(),
            last_log_level: None,
            on_failure: None,
        };
        mailer.apply_defaults();
        mailer
    }

    /// Sets the hook called with the mailer and transcript when a send
    /// fails.
    #[must_use]
    pub fn on_failure(mut self, hook: impl Fn(&Self, &str) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Box::new(hook));
        self
    }

    /// Charset the message is sent in.
    #[must_use]
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// The mailer configuration.
    #[must_use]
    pub const fn config(&self) -> &MailerConfig {
        &self.config
    }

    /// The transport session.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport session.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Recipients of `role` in insertion order, with their display names.
    pub fn recipients(&self, role: Role) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.recipients
            .get(&role)
            .into_iter()
            .flatten()
            .map(|(email, title)| (email.as_str(), title.as_deref()))
    }

    /// Content parts in insertion order.
    pub fn parts(&self) -> impl Iterator<Item = &ContentPart> {
        self.parts.values()
    }

    fn apply_defaults(&mut self) {
        if let Some(errors_to) = self.config.errors_to.clone() {
            self.set_errors_to(&errors_to, None);
        }
        if let Some(reply_to) = self.config.reply_to.clone() {
            self.set_reply_to(&reply_to, None);
        }
        if let Some(from_mail) = self.config.from_mail.clone() {
            let from_name = self.config.from_name.clone();
            self.set_from(&from_mail, from_name.as_deref());
        }
    }

    /// Adds a recipient. Adding an address again replaces its display name
    /// and keeps its position.
    pub fn add_recipient(&mut self, role: Role, email: &str, title: Option<&str>) {
        self.recipients
            .entry(role)
            .or_default()
            .insert(email.to_string(), title.map(str::to_string));
    }

    /// Adds a `To` recipient.
    pub fn add_to(&mut self, email: &str, title: Option<&str>) {
        self.add_recipient(Role::To, email, title);
    }

    /// Adds a `Cc` recipient.
    pub fn add_cc(&mut self, email: &str, title: Option<&str>) {
        self.add_recipient(Role::Cc, email, title);
    }

    /// Adds a `Bcc` recipient.
    pub fn add_bcc(&mut self, email: &str, title: Option<&str>) {
        self.add_recipient(Role::Bcc, email, title);
    }

    /// Sets the `From` header.
    pub fn set_from(&mut self, email: &str, title: Option<&str>) {
        self.set_mailbox("From", email, title);
    }

    /// Sets the `Reply-To` header.
    pub fn set_reply_to(&mut self, email: &str, title: Option<&str>) {
        self.set_mailbox("Reply-To", email, title);
    }

    /// Sets the bounce address, sent as the `Sender` header.
    pub fn set_errors_to(&mut self, email: &str, title: Option<&str>) {
        self.set_mailbox("Sender", email, title);
    }

    fn set_mailbox(&mut self, header: &str, email: &str, title: Option<&str>) {
        let value = format_mailbox(email, title, &self.charset);
        self.transport.set(header, &value);
    }

    /// Sets a header verbatim. The value must already be encoded.
    pub fn set(&mut self, header: &str, value: &str) {
        self.transport.set(header, value);
    }

    /// Stores a content part for `mime`, replacing an earlier part of the
    /// same type in place. `charset` defaults to the mailer charset.
    pub fn set_content(&mut self, mime: &str, data: impl Into<String>, charset: Option<&str>) {
        let charset = charset.unwrap_or(&self.charset);
        let part = ContentPart::new(mime, data, charset);
        self.parts.insert(mime.trim().to_ascii_lowercase(), part);
    }

    /// Sets the `text/plain` part.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.set_content("text/plain", text, None);
    }

    /// Sets the `text/html` part, routing its links through the jump
    /// endpoint when link tracking is on.
    pub fn set_html(&mut self, html: impl Into<String>) {
        let mut html = html.into();
        if self.config.tracking.jump_links {
            html = rewrite_links(&html, &self.config.tracking.jump_url());
        }
        self.set_content("text/html", html, None);
    }

    /// Queues a file attachment on the transport.
    pub fn attach_file(&mut self, path: impl AsRef<Path>, alias: Option<&str>, content_id: Option<&str>) {
        let mut attachment = Attachment::new(path.as_ref());
        if let Some(alias) = alias {
            attachment = attachment.with_alias(alias);
        }
        if let Some(content_id) = content_id {
            attachment = attachment.with_content_id(content_id);
        }
        self.transport.attach(attachment);
    }

    /// Removes all recipients of `role` and their header.
    pub fn reset_recipients(&mut self, role: Role) {
        self.recipients.shift_remove(&role);
        self.transport.clear(role.header_name());
    }

    /// Removes all recipients and starts a fresh transport session.
    ///
    /// Headers, attachments and the transcript are dropped with the old
    /// session; the configured sender defaults are applied again. Content
    /// parts are kept.
    pub fn reset_all(&mut self) {
        self.recipients.clear();
        self.last_log_level = None;
        self.transport = T::open(&self.config.smtp);
        self.apply_defaults();
    }

    /// Sends the message with a verbose transcript.
    pub fn send(&mut self, subject: &str, mock: bool) -> SendReport {
        self.send_with_log(subject, mock, LogLevel::default())
    }

    /// Sends the message.
    ///
    /// The success flag is the transport's own. On failure the failure hook,
    /// if any, is called once with the transcript.
    pub fn send_with_log(&mut self, subject: &str, mock: bool, log_level: LogLevel) -> SendReport {
        let mut recipient_count = 0;
        for role in Role::ALL {
            let Some(list) = self.recipients.get(&role).filter(|list| !list.is_empty()) else {
                continue;
            };
            recipient_count += list.len();
            let value = list
                .iter()
                .map(|(email, title)| format_mailbox(email, title.as_deref(), &self.charset))
                .collect::<Vec<_>>()
                .join(", ");
            self.transport.set(role.header_name(), &value);
        }

        let encoded_subject = encode_header(subject, &self.charset);
        self.transport.set("Subject", &encoded_subject);

        let body = body::assemble(self.parts.values());
        match &body.content_type {
            Some(content_type) => self.transport.set("Content-Type", content_type),
            None => self.transport.clear("Content-Type"),
        }
        tracing::debug!(
            parts = self.parts.len(),
            content_type = body.content_type.as_deref().unwrap_or("none"),
            "body assembled"
        );

        let encoded = charset::transcode(&body.text, &self.charset);
        let success = self.transport.send(&encoded, log_level, mock);
        self.last_log_level = Some(log_level);
        let log = self.transport.log();

        if success {
            tracing::info!(success, mock, recipients = recipient_count, parts = self.parts.len(), "message sent");
        } else {
            tracing::warn!(mock, recipients = recipient_count, "transport rejected message");
            if let Some(hook) = &self.on_failure {
                hook(self, &log);
            }
        }

        SendReport {
            success,
            transcript_available: self.archived_message().is_some(),
        }
    }

    /// The transport session transcript.
    #[must_use]
    pub fn log(&self) -> String {
        self.transport.log()
    }

    /// The transmitted message carved from the transcript.
    ///
    /// Only a verbose transcript carries the DATA payload; anything else
    /// has no message to archive.
    fn archived_message(&self) -> Option<String> {
        if self.last_log_level != Some(LogLevel::Verbose) {
            return None;
        }
        let message = transcript::extract(&self.transport.log());
        (!message.is_empty()).then_some(message)
    }

    /// Writes the transmitted message to `storage_path/filename`.
    ///
    /// Returns the written path, or `None` if nothing was sent with a
    /// verbose transcript or the transcript holds no message.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, filename: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let Some(message) = self.archived_message() else {
            return Ok(None);
        };

        let dir = &self.config.storage_path;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(filename);
        std::fs::write(&path, message)?;

        tracing::debug!(path = %path.display(), "message archived");
        Ok(Some(path))
    }
}
