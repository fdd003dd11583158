//! Mailer configuration.
//!
//! Everything the mailer needs is passed in explicitly; there is no global
//! configuration store. The structs deserialize from JSON with every field
//! optional, so a config file only has to list what differs from the
//! defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Default route of the click-tracking endpoint.
pub const DEFAULT_JUMP_ROUTE: &str = "/mailer-jump";

/// Default route of the open-tracking beacon; `@hash` marks the hash.
pub const DEFAULT_PING_ROUTE: &str = "/mailer-ping/@hash.png";

/// Security/encryption mode for connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// No encryption.
    #[default]
    None,
    /// Implicit TLS (connect directly with TLS).
    Tls,
    /// STARTTLS upgrade after plaintext connect.
    StartTls,
}

/// SMTP server configuration handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Username for authentication.
    pub username: String,
    /// Password for authentication.
    pub password: String,
}

impl SmtpConfig {
    /// Get default port for the security mode.
    #[must_use]
    pub const fn default_port(security: Security) -> u16 {
        match security {
            Security::None => 25,
            Security::StartTls => 587,
            Security::Tls => 465,
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: Self::default_port(Security::None),
            security: Security::None,
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Click and open tracking settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Rewrite HTML links through the jump endpoint.
    pub jump_links: bool,
    /// Scheme, host and base path the endpoints are served under,
    /// e.g. `https://example.com/app`.
    pub base_url: String,
    /// Route of the click-tracking endpoint.
    pub jump_route: String,
    /// Route of the open-tracking beacon, containing `@hash`.
    pub ping_route: String,
}

impl TrackingConfig {
    /// Absolute URL of the jump endpoint.
    #[must_use]
    pub fn jump_url(&self) -> String {
        join_url(&self.base_url, &self.jump_route)
    }

    /// Absolute URL of the beacon for `hash`.
    #[must_use]
    pub fn ping_url(&self, hash: &str) -> String {
        join_url(&self.base_url, &self.ping_route.replace("@hash", hash))
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            jump_links: false,
            base_url: String::new(),
            jump_route: DEFAULT_JUMP_ROUTE.to_string(),
            ping_route: DEFAULT_PING_ROUTE.to_string(),
        }
    }
}

fn join_url(base: &str, route: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), route.trim_start_matches('/'))
}

/// Mailer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailerConfig {
    /// Charset messages are sent in.
    pub charset: String,
    /// SMTP server settings.
    pub smtp: SmtpConfig,
    /// Default sender address.
    pub from_mail: Option<String>,
    /// Default sender display name.
    pub from_name: Option<String>,
    /// Default `Reply-To` address.
    pub reply_to: Option<String>,
    /// Default bounce address, sent as `Sender`.
    pub errors_to: Option<String>,
    /// Directory archived `.eml` files are written to.
    pub storage_path: PathBuf,
    /// Tracking settings.
    pub tracking: TrackingConfig,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            charset: "UTF-8".to_string(),
            smtp: SmtpConfig::default(),
            from_mail: None,
            from_name: None,
            reply_to: None,
            errors_to: None,
            storage_path: PathBuf::from("mail"),
            tracking: TrackingConfig::default(),
        }
    }
}

impl MailerConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has wrongly typed fields.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
