use thiserror::Error;

use crate::database::StoreError;

/// Errors returned by the job control operations.
#[derive(Debug, Error)]
pub enum JobError {
    /// Malformed input, e.g. an invalid URL or a missing name
    #[error("invalid job: {0}")]
    Validation(String),

    /// Unknown id, or an id owned by somebody else. The two are deliberately
    /// indistinguishable.
    #[error("job not found")]
    NotFound,

    /// The operation does not fit the job's current state
    #[error("{0}")]
    Conflict(String),

    #[error("job store failure: {0}")]
    Persistence(#[source] StoreError),
}

impl From<StoreError> for JobError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => JobError::NotFound,
            other => JobError::Persistence(other),
        }
    }
}

pub type JobResult<T> = Result<T, JobError>;
