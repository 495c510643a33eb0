//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Username is empty or contains line breaks
    #[error("Invalid username {username:?}: {reason}")]
    InvalidUsername { username: String, reason: String },

    /// Password contains line breaks and could never be typed on the wire
    #[error("Invalid password for {username}: {reason}")]
    InvalidPassword { username: String, reason: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
