use thiserror::Error;

/// Errors surfaced by screening operations.
///
/// `InvalidInput` and `NotFound` are recoverable and meant to be shown to the
/// operator as a warning. `PersistenceFailure` means the in-memory change was
/// kept but the data file was not rewritten; the caller may retry the save.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScreeningError {
    /// Missing or malformed input, including malformed stored values
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No record matched
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage read or write failed
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl ScreeningError {
    /// Whether the operator can fix the problem and try again locally
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ScreeningError::InvalidInput(_) | ScreeningError::NotFound(_))
    }
}
