//! Tracing-backed event publisher and error reporter.
//!
//! The default sinks: lifecycle events and swallowed errors become structured
//! log records.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::domain::{Propagation, WorkerEvent};
use crate::ports::{ErrorReporter, EventPublisher, PublishError};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: &WorkerEvent) -> Result<Propagation, PublishError> {
        let kind = event.kind().as_str();
        match event {
            WorkerEvent::Looping { connection, queues } => {
                debug!(event = kind, %connection, %queues, "looping");
            }
            WorkerEvent::JobProcessing { connection, job } => {
                info!(
                    event = kind,
                    %connection,
                    job_id = %job.id,
                    job = %job.name,
                    queue = %job.queue,
                    attempts = job.attempts,
                    "processing"
                );
            }
            WorkerEvent::JobProcessed { connection, job } => {
                info!(event = kind, %connection, job_id = %job.id, job = %job.name, "processed");
            }
            WorkerEvent::JobExceptionOccurred {
                connection,
                job,
                cause,
            } => {
                warn!(
                    event = kind,
                    %connection,
                    job_id = %job.id,
                    job = %job.name,
                    attempts = job.attempts,
                    cause = cause.kind(),
                    error = %cause,
                    "job raised"
                );
            }
            WorkerEvent::JobFailed {
                connection,
                job,
                cause,
            } => {
                error!(
                    event = kind,
                    %connection,
                    job_id = %job.id,
                    job = %job.name,
                    attempts = job.attempts,
                    cause = cause.kind(),
                    error = %cause,
                    "job permanently failed"
                );
            }
            WorkerEvent::WorkerStopping { status } => {
                info!(event = kind, status, "worker stopping");
            }
        }
        Ok(Propagation::Continue)
    }
}

/// Logs reported errors, with their source chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, err: &(dyn std::error::Error + 'static)) {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(s) = source {
            chain.push(s.to_string());
            source = s.source();
        }
        error!(error = %err, caused_by = ?chain, "reported error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FailureCause, JobDescriptor};

    #[tokio::test]
    async fn publisher_never_stops_propagation() {
        let publisher = TracingEventPublisher;
        let job = JobDescriptor {
            id: "job-1".to_string(),
            name: "echo".to_string(),
            queue: "default".to_string(),
            attempts: 1,
        };
        let events = [
            WorkerEvent::Looping {
                connection: "memory".to_string(),
                queues: "default".to_string(),
            },
            WorkerEvent::JobFailed {
                connection: "memory".to_string(),
                job,
                cause: FailureCause::ManuallyFailed,
            },
            WorkerEvent::WorkerStopping { status: 0 },
        ];
        for event in &events {
            assert_eq!(publisher.publish(event).await.unwrap(), Propagation::Continue);
        }
    }
}
