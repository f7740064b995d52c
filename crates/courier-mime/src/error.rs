//! Error types for MIME composition.

use std::io;
use std::path::PathBuf;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME composition errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Header name or value cannot be written.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Message has no From mailbox.
    #[error("Message has no From address")]
    MissingFrom,

    /// Message has no recipients.
    #[error("Message has no recipients")]
    NoRecipients,

    /// An attachment file could not be read.
    #[error("Could not read attachment {path}: {source}")]
    Attachment {
        /// Path of the attachment.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
