//! Repository Module
//!
//! Free-function CRUD over the SQLite pool. Functions that take part in a unit
//! of work accept `&mut SqliteConnection` so callers can pass `&mut *tx`.

pub mod order;
pub mod product;
pub mod user;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Write lock not obtained within the busy timeout
    #[error("Database busy: {0}")]
    Busy(String),
}

/// SQLITE_BUSY, SQLITE_LOCKED and their extended codes
fn is_busy_code(code: &str) -> bool {
    matches!(code, "5" | "6" | "261" | "517" | "262")
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepoError::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                RepoError::Validation(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) if db_err.code().is_some_and(|c| is_busy_code(&c)) => {
                RepoError::Busy(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut => RepoError::Busy(err.to_string()),
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
