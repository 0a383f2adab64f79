//! Domain errors
//!
//! Validation and state-conflict errors are programmer-visible and fail
//! fast; transport failures never appear here, they are absorbed into
//! the call's outcome model.

use thiserror::Error;

/// Domain result type
pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// Bad input at construction or configuration time
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A transition guard rejected the requested state change
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Operation not allowed in the entity's current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    /// Persistence or serialization failure
    #[error("Internal error: {0}")]
    Internal(String),
}
