//! Scheduler error types

use clout_domain::CloutError;
use thiserror::Error;

use crate::errors::InfraError;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler already running")]
    AlreadyRunning,

    #[error("Scheduler not running")]
    NotRunning,

    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let clout_err = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                CloutError::InvalidInput(err.to_string())
            }
            _ => CloutError::Internal(err.to_string()),
        };
        InfraError(clout_err)
    }
}

impl From<SchedulerError> for CloutError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
