//! Error types for Releve

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Tag error: {0}")]
    Tag(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why the storage layer refused to insert a transaction.
///
/// Derived from SQLite's extended result codes so callers can branch on the
/// kind of rejection without looking at message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InsertError {
    /// The (account, date, amount, original label) key already exists
    #[error("duplicate transaction")]
    DuplicateKey,

    #[error("{field}: {reason}")]
    ConstraintViolation { field: String, reason: String },

    /// Anything else the store reported (pool exhaustion, I/O, ...)
    #[error("{0}")]
    Storage(String),
}

impl From<Error> for InsertError {
    fn from(err: Error) -> Self {
        InsertError::Storage(err.to_string())
    }
}
