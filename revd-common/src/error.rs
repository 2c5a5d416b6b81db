//! Common error types for REVD

use thiserror::Error;

/// Common result type for REVD operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across REVD service binaries
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Classification collaborator failure (retryable by queue policy)
    #[error("Classification error: {0}")]
    Classification(String),

    /// Job hand-off to the queue failed (logged, never fails a read)
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
