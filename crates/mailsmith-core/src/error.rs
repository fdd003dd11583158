//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
///
/// Composing and sending never produce these; sending reports failure
/// through [`crate::SendReport`]. Only configuration loading and archive
/// writes do.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// MIME decoding error.
    #[error("MIME error: {0}")]
    Mime(#[from] mailsmith_mime::Error),

    /// Recipient role name not recognized.
    #[error("Unknown recipient role: {0}")]
    UnknownRole(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
