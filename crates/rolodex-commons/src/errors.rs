//! Shared error taxonomy for Rolodex.
//!
//! The core surfaces a kind and a message; mapping kinds to HTTP status
//! codes is the boundary's job, not ours. Validation and ownership errors
//! are raised immediately and never retried; storage failures are not
//! retried by the core either.

use thiserror::Error;

/// Main error type for Rolodex operations.
#[derive(Error, Debug)]
pub enum RolodexError {
    /// No matching live row for the given external id, or a table with no
    /// introspectable schema.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row exists but its owner is not the caller. Deliberately distinct
    /// from NotFound: clients key retry/redirect behavior off the
    /// difference.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Client-side mistake: empty insert/update payload, invalid table
    /// name, malformed search options.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration or secret retrieval failure.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage connectivity or execution failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error between storage and the record representation.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (unexpected state).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RolodexError {
    /// Creates a NotFound error with a message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates a PermissionDenied error with a message.
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Creates an InvalidInput error with a message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates a Storage error with a message.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Returns true when the error should be treated as a client error
    /// rather than a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::PermissionDenied(_) | Self::InvalidInput(_)
        )
    }
}

impl From<serde_json::Error> for RolodexError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type alias using RolodexError.
pub type RolodexResult<T> = std::result::Result<T, RolodexError>;
