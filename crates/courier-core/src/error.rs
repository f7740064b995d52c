//! Error types for the dispatch subsystem.

use thiserror::Error;

use crate::render::RenderError;

/// Errors that can occur while dispatching email.
///
/// A send cancelled by a hook is not an error; see
/// [`DispatchOutcome`](crate::DispatchOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// Settings are missing or invalid for the selected protocol.
    ///
    /// Raised before any network activity.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A subject or body template failed to render.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The transport failed to hand off the message.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// No keyed message is registered under this key.
    #[error("Unknown message key: {0}")]
    UnknownMessageKey(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn delivery(error: impl std::fmt::Display) -> Self {
        Self::Delivery(error.to_string())
    }

    /// Returns true for errors raised before any transport was contacted.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
