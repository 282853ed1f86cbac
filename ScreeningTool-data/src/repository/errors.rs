use std::sync::PoisonError;
use thiserror::Error;

/// Error type for repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found error
    #[error("Record not found: {0}")]
    NotFound(String),

    /// File system error while reading or writing the data file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unwritable tabular data
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed login state file
    #[error("State file error: {0}")]
    State(#[from] serde_json::Error),

    /// Lock error
    #[error("Lock error: {0}")]
    Lock(String),

    /// The in-memory store was changed but the data file could not be rewritten.
    /// The change is kept in memory and a later save may succeed.
    #[error("Record {code} kept in memory but not saved: {reason}")]
    Unsaved {
        /// Unique code of the record that was touched
        code: String,
        /// Underlying write failure
        reason: String,
    },
}

impl<T> From<PoisonError<T>> for RepositoryError {
    fn from(error: PoisonError<T>) -> Self {
        RepositoryError::Lock(error.to_string())
    }
}
