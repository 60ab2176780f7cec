//! Core error types for DBM
//!
//! Every crate converts its own error into [`DbmError`] at the service
//! boundary so that list endpoints can map failures onto a status code.

use thiserror::Error;

/// Core error type for all DBM operations
#[derive(Error, Debug)]
pub enum DbmError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// The caller supplied a malformed filter, order-by or page token.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Standard Result type for DBM operations
pub type DbmResult<T> = Result<T, DbmError>;

impl DbmError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// HTTP status code mapping for errors
    pub fn status_code(&self) -> u16 {
        match self {
            DbmError::NotFound { .. } => 404,
            DbmError::InvalidArgument { .. } => 400,
            DbmError::Database(_) | DbmError::Internal(_) | DbmError::Config(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DbmError::NotFound { .. } => "not_found",
            DbmError::InvalidArgument { .. } => "invalid_argument",
            DbmError::Database(_) => "database_error",
            DbmError::Internal(_) => "internal_error",
            DbmError::Config(_) => "configuration_error",
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbmError::Database(_))
    }
}
