//! Queue port - ジョブを取り出すバックエンドの抽象化
//!
//! The worker only ever pops; pushing, leasing and visibility timeouts belong
//! to the backend. Two workers must never observe the same job as available at
//! the same time, and the backend is the one that guarantees it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BoxError, FailureCause, JobDescriptor};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("unknown queue connection '{0}'")]
    UnknownConnection(String),

    /// A delete/release was attempted on a job that is already deleted.
    #[error("job {0} is already deleted")]
    AlreadyDeleted(String),

    #[error("queue operation failed: {0}")]
    OperationFailed(String),
}

/// One unit of enqueued work, as handed out by [`Queue::pop`].
///
/// # Acknowledgement contract
/// The worker never deletes a job that ran successfully. `fire()` is expected
/// to acknowledge (delete) the job itself once its work is done; a backend
/// that does not will see the job again once its lease expires.
///
/// # Deletion
/// Once `is_deleted()` returns true, `delete`, `release` and `failed` must not
/// be called again. Backends reject such calls with
/// [`QueueError::AlreadyDeleted`].
#[async_trait]
pub trait Job: Send + Sync {
    /// Backend-specific identifier.
    fn id(&self) -> String;

    /// Name of the job (usually the handler it dispatches to).
    fn name(&self) -> &str;

    /// Queue the job was popped from.
    fn queue(&self) -> &str;

    /// Number of times the job has been picked up, including this one.
    /// Incremented by the backend at pop time.
    fn attempts(&self) -> u32;

    /// Per-job timeout, overriding the worker default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Per-job attempt limit, overriding the worker default.
    fn max_tries(&self) -> Option<u32> {
        None
    }

    /// Run the job's business logic.
    async fn fire(&mut self) -> Result<(), BoxError>;

    fn mark_as_failed(&mut self);

    fn has_failed(&self) -> bool;

    fn is_deleted(&self) -> bool;

    async fn delete(&mut self) -> Result<(), QueueError>;

    /// Put the job back on its queue, available again after `delay`.
    async fn release(&mut self, delay: Duration) -> Result<(), QueueError>;

    /// The job's own "permanently failed" hook.
    async fn failed(&mut self, cause: &FailureCause) -> Result<(), BoxError>;

    fn describe(&self) -> JobDescriptor {
        JobDescriptor {
            id: self.id(),
            name: self.name().to_string(),
            queue: self.queue().to_string(),
            attempts: self.attempts(),
        }
    }
}

/// Queue port (interface).
#[async_trait]
pub trait Queue: Send + Sync {
    /// Pop the next available job from `queue`, without blocking.
    async fn pop(&self, queue: &str) -> Result<Option<Box<dyn Job>>, QueueError>;
}

/// Resolves connection names to queues.
pub trait QueueManager: Send + Sync {
    fn connection(&self, name: &str) -> Result<Arc<dyn Queue>, QueueError>;

    /// Is the application in maintenance mode?
    fn is_down_for_maintenance(&self) -> bool;
}
