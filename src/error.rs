use crate::ids::{ScheduleId, TaskId};
use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("schedule {0} not found")]
    ScheduleNotFound(ScheduleId),

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// Backend failures are passed through untouched.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::ScheduleNotFound(_) | StoreError::TaskNotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }

    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            StoreError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
