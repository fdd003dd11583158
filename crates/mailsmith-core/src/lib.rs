//! # mailsmith-core
//!
//! Outbound email composition for `Mailsmith`.
//!
//! This crate provides:
//! - **Composer** - [`Mailer`] collects recipients, content and attachments
//!   and renders them in a fixed charset
//! - **Transport seam** - the [`Transport`] trait, with
//!   [`SimulatedTransport`] for previews and tests
//! - **Archiving** - carving the sent message out of the session
//!   transcript and writing it as `.eml`
//! - **Tracking** - link rewriting for click tracking and the ping/jump
//!   endpoint handlers
//!
//! Header encoding, address formatting and charset conversion live in
//! `mailsmith-mime`.
//!
//! ## Example
//!
//! ```
//! use mailsmith_core::{Mailer, MailerConfig, SimulatedTransport};
//!
//! let mut mailer: Mailer<SimulatedTransport> = Mailer::new(MailerConfig::default());
//! mailer.set_from("noreply@example.com", Some("Example"));
//! mailer.add_to("ann@example.com", Some("Ann"));
//! mailer.set_text("Hello Ann");
//!
//! let report = mailer.send("Welcome", true);
//! assert!(report.success);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
mod mailer;
pub mod tracking;
pub mod transcript;
pub mod transport;

pub use config::{MailerConfig, Security, SmtpConfig, TrackingConfig};
pub use error::{Error, Result};
pub use mailer::{Mailer, Role, SendReport};
pub use tracking::{PingResponse, Tracker, rewrite_links};
pub use transport::{Attachment, LogLevel, SimulatedTransport, Transport};
