//! # mailsmith-mime
//!
//! MIME building blocks for composing outbound email.
//!
//! ## Features
//!
//! - **Charsets**: best-effort UTF-8 to legacy charset transcoding
//! - **Header encoding**: RFC 2047 `B` encoded-words, folded to 75 columns
//! - **Mailboxes**: `"Name" <address>` rendering with encoded display names
//! - **Content types**: `type/subtype; param=value` with ordered parameters
//! - **Bodies**: single-part and `multipart/alternative` assembly
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsmith_mime::encoding::encode_header;
//! use mailsmith_mime::format_mailbox;
//!
//! let subject = encode_header("Grüße aus Köln", "UTF-8");
//! assert!(subject.starts_with("=?UTF-8?B?"));
//!
//! let to = format_mailbox("jane@example.com", Some("Jane Doe"), "UTF-8");
//! assert_eq!(to, "\"Jane Doe\" <jane@example.com>");
//! ```
//!
//! ### Bodies
//!
//! ```ignore
//! use mailsmith_mime::{ContentPart, body};
//!
//! let parts = [
//!     ContentPart::new("text/plain", "Hello", "UTF-8"),
//!     ContentPart::new("text/html", "<p>Hello</p>", "UTF-8"),
//! ];
//! let body = body::assemble(&parts);
//! assert!(body.content_type.unwrap().starts_with("multipart/alternative"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod content_type;
mod error;
mod header;

pub mod body;
pub mod charset;
pub mod encoding;

pub use address::{Mailbox, extract_addresses, format_mailbox};
pub use body::{Body, ContentPart};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
