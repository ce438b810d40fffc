//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Stored value could not be decoded into a domain type
    #[error("corrupt row: {0}")]
    Decode(String),
}

/// Result alias for database operations
pub type DbResult<T> = Result<T, DbError>;
