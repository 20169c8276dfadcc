//! Worker errors.

use thiserror::Error;

use super::events::JobDescriptor;
use super::failure::FailureCause;
use super::state::JobState;
use crate::ports::QueueError;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// A job failed; `state` tells whether it was released or permanently failed.
    /// The original cause is kept as the error source.
    #[error("job {} ({}) failed on attempt {}, now {:?}", .job.id, .job.name, .job.attempts, .state)]
    JobFailed {
        job: JobDescriptor,
        state: JobState,
        #[source]
        cause: FailureCause,
    },

    #[error("queue connection unavailable")]
    Connection(#[from] QueueError),
}

impl WorkerError {
    /// The failure cause, for `JobFailed`.
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            WorkerError::JobFailed { cause, .. } => Some(cause),
            WorkerError::Connection(_) => None,
        }
    }

    pub fn state(&self) -> Option<JobState> {
        match self {
            WorkerError::JobFailed { state, .. } => Some(*state),
            WorkerError::Connection(_) => None,
        }
    }
}
