//! Errors raised inside the SQLite backend.
//!
//! These never leave the infrastructure layer: the repository maps every
//! variant to [`RepositoryError::Unavailable`].

use thiserror::Error;

use crate::domain::RepositoryError;

/// Errors that can occur during SQLite store operations.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// A stored row violates a domain invariant (e.g. empty body).
    #[error("corrupt row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
}

impl From<SqliteStoreError> for RepositoryError {
    fn from(e: SqliteStoreError) -> Self {
        RepositoryError::Unavailable(e.to_string())
    }
}

/// Convenience type alias for SQLite store results.
pub type Result<T> = std::result::Result<T, SqliteStoreError>;
