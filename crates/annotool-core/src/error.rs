//! Error types for annotool.

use thiserror::Error;

/// Result type alias using annotool's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for annotool operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Referenced id or parent does not exist or is soft-deleted
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness constraint violated (e.g. a second video with the same external id)
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Access gate denied the caller
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Client-side precondition failed (missing parent, dangling reference)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unexpected failure, including partially completed multi-step operations
    #[error("Server error: {0}")]
    Server(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap any error as a server error with context, keeping the original message.
    ///
    /// Used by multi-step operations that abort on the first failing sub-step.
    /// A `Server` error is returned unchanged so nested steps keep the context
    /// of the step that actually failed.
    pub fn server(context: impl std::fmt::Display, source: Error) -> Self {
        match source {
            Error::Server(_) => source,
            other => Error::Server(format!("{}: {}", context, other)),
        }
    }

    /// True for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
