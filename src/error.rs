//! Error types for prepboard.

use thiserror::Error;

/// Common infrastructure error type for prepboard.
///
/// Domain flows (verification, login, moderation) have their own error enums
/// and wrap this one for store and I/O failures.
#[derive(Error, Debug)]
pub enum PrepboardError {
    /// Database error.
    ///
    /// Errors from sqlx are converted automatically and carry the driver message.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for PrepboardError {
    fn from(e: sqlx::Error) -> Self {
        PrepboardError::Database(e.to_string())
    }
}

impl PrepboardError {
    /// Check whether this error came from a UNIQUE constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, PrepboardError::Database(msg) if msg.contains("UNIQUE"))
    }
}

/// Result type alias for prepboard operations.
pub type Result<T> = std::result::Result<T, PrepboardError>;
