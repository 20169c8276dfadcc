//! Lifecycle events published by the worker.

use serde::Serialize;

use super::failure::FailureCause;

/// Snapshot of the job an event refers to.
///
/// Owned so events can outlive the borrowed job and be handed to any
/// publisher implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDescriptor {
    pub id: String,
    pub name: String,
    pub queue: String,
    pub attempts: u32,
}

/// Answer of a publisher: keep going, or stop propagation.
///
/// `Stop` in reply to [`WorkerEvent::Looping`] pauses job execution for the
/// current iteration. For every other event it is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    #[default]
    Continue,
    Stop,
}

impl Propagation {
    pub fn is_stopped(self) -> bool {
        matches!(self, Propagation::Stop)
    }
}

/// Event kinds, used for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Looping,
    JobProcessing,
    JobProcessed,
    JobExceptionOccurred,
    JobFailed,
    WorkerStopping,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Looping => "looping",
            EventKind::JobProcessing => "job_processing",
            EventKind::JobProcessed => "job_processed",
            EventKind::JobExceptionOccurred => "job_exception_occurred",
            EventKind::JobFailed => "job_failed",
            EventKind::WorkerStopping => "worker_stopping",
        }
    }
}

/// Lifecycle events of one worker process.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// Published on every loop iteration once maintenance and pause checks
    /// pass, whether or not a job was popped. A `Stop` answer skips the job
    /// and idles for one second.
    Looping { connection: String, queues: String },

    JobProcessing { connection: String, job: JobDescriptor },

    JobProcessed { connection: String, job: JobDescriptor },

    /// Any failure of a job, retried or not.
    JobExceptionOccurred {
        connection: String,
        job: JobDescriptor,
        cause: FailureCause,
    },

    /// The job was permanently failed and deleted.
    JobFailed {
        connection: String,
        job: JobDescriptor,
        cause: FailureCause,
    },

    WorkerStopping { status: i32 },
}

impl WorkerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WorkerEvent::Looping { .. } => EventKind::Looping,
            WorkerEvent::JobProcessing { .. } => EventKind::JobProcessing,
            WorkerEvent::JobProcessed { .. } => EventKind::JobProcessed,
            WorkerEvent::JobExceptionOccurred { .. } => EventKind::JobExceptionOccurred,
            WorkerEvent::JobFailed { .. } => EventKind::JobFailed,
            WorkerEvent::WorkerStopping { .. } => EventKind::WorkerStopping,
        }
    }

    pub fn job(&self) -> Option<&JobDescriptor> {
        match self {
            WorkerEvent::JobProcessing { job, .. }
            | WorkerEvent::JobProcessed { job, .. }
            | WorkerEvent::JobExceptionOccurred { job, .. }
            | WorkerEvent::JobFailed { job, .. } => Some(job),
            WorkerEvent::Looping { .. } | WorkerEvent::WorkerStopping { .. } => None,
        }
    }

    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            WorkerEvent::JobExceptionOccurred { cause, .. }
            | WorkerEvent::JobFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> JobDescriptor {
        JobDescriptor {
            id: "job-1".to_string(),
            name: "send_email".to_string(),
            queue: "emails".to_string(),
            attempts: 1,
        }
    }

    #[test]
    fn event_kind_serializes_as_snake_case() {
        let s = serde_json::to_string(&EventKind::JobExceptionOccurred).unwrap();
        assert_eq!(s, "\"job_exception_occurred\"");
        assert_eq!(EventKind::WorkerStopping.as_str(), "worker_stopping");
    }

    #[test]
    fn accessors_expose_job_and_cause() {
        let failed = WorkerEvent::JobFailed {
            connection: "default".to_string(),
            job: descriptor(),
            cause: FailureCause::ManuallyFailed,
        };
        assert_eq!(failed.kind(), EventKind::JobFailed);
        assert_eq!(failed.job().map(|j| j.name.as_str()), Some("send_email"));
        assert!(matches!(failed.cause(), Some(FailureCause::ManuallyFailed)));

        let stopping = WorkerEvent::WorkerStopping { status: 12 };
        assert!(stopping.job().is_none());
        assert!(stopping.cause().is_none());
    }

    #[test]
    fn default_propagation_continues() {
        assert!(!Propagation::default().is_stopped());
        assert!(Propagation::Stop.is_stopped());
    }
}
