use thiserror::Error;

use crate::models::TaskId;

/// Errors surfaced by the tracker core.
///
/// Most read-side operations degrade to a silent no-op on an unknown id;
/// the variants here cover the cases a caller must be told about.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The operation referenced a task id the registry does not know.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The operation is not legal in the current state, e.g. deleting a
    /// task that is still in the active set.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// I/O failure in the persistence gateway.
    #[error("persistence error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted blob could not be (de)serialized.
    #[error("persistence error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Rejected input, e.g. a blank task name.
    #[error("validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
