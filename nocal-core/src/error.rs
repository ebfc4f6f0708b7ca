//! Error types for nocal operations.

use thiserror::Error;

/// Errors returned by the calendar core.
///
/// `Internal` carries no payload. Store failures are logged where they
/// happen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NocalError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("user has no rights to {0}")]
    Forbidden(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("something went wrong")]
    Internal,
}

impl NocalError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, NocalError::NotFound(_))
    }
}

/// Result type alias for nocal operations.
pub type NocalResult<T> = Result<T, NocalError>;
