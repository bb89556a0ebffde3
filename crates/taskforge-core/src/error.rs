use thiserror::Error;

use taskforge_store::StoreError;

/// Errors raised by the core operations.
///
/// Every variant carries the message surfaced to the caller; the HTTP layer
/// maps variants to status codes without altering the text.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A referenced todo/item/message/user does not exist.
    #[error("{0}")]
    NotFound(String),

    /// An empty/blank required field or a malformed registration value.
    #[error("{0}")]
    Validation(String),

    /// The entity's review state forbids the operation.
    #[error("{0}")]
    InvalidState(String),

    /// Generic invalid-operation signal (reviewing a todo that is not
    /// completed).  Deliberately distinct from [`ApiError::InvalidState`].
    #[error("{0}")]
    InvalidOperation(String),

    /// A completion collides with state owned by another user, or item
    /// prerequisites are unmet.
    #[error("{0}")]
    Conflict(String),

    /// The acting identity lacks the ownership required for this
    /// operation.
    #[error("{0}")]
    Forbidden(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// The acting identity lacks the role required by the endpoint.
    /// Distinct from [`ApiError::Forbidden`], which is ownership-based.
    #[error("{0}")]
    AccessDenied(String),

    /// Unexpected server-side failure.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Persistence failure.
    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;
