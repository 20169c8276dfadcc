//! Worker - デーモンループとジョブの状態遷移
//!
//! # フロー（1 イテレーション）
//! 1. キュー名を左から順に pop して最初のジョブを取る
//! 2. Watchdog を (timeout + sleep) 秒で張り直す
//! 3. 実行してよい状態か確認（ジョブの有無に関係なく毎回）。ダメなら 1 秒 sleep
//!    してスキップ、良ければジョブを process()、ジョブがなければ sleep
//! 4. メモリ上限 / SIGTERM / 再起動トークンを確認して、必要なら停止
//!
//! # process() の状態遷移
//! - Processing -> Succeeded
//! - Processing -> RetryScheduled（release して元のエラーを返す）
//! - Processing -> PermanentlyFailed（delete + failed フック、元のエラーを返す）

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    FailureCause, JobState, Propagation, RestartToken, WorkerError, WorkerEvent, WorkerExit,
    WorkerOptions,
};
use crate::ports::{
    ErrorReporter, EventPublisher, Job, MemoryProbe, Queue, QueueManager, RestartSignalStore,
    Terminator,
};

use super::signals::ControlFlags;
use super::watchdog::Watchdog;

/// How long the loop idles when it is not allowed to run jobs.
const GATED_SLEEP: Duration = Duration::from_secs(1);

/// A single-process queue worker. Build one with [`super::WorkerBuilder`].
pub struct Worker {
    pub(super) manager: Arc<dyn QueueManager>,
    pub(super) events: Arc<dyn EventPublisher>,
    pub(super) reporter: Arc<dyn ErrorReporter>,
    pub(super) restart_store: Option<Arc<dyn RestartSignalStore>>,
    pub(super) memory: Arc<dyn MemoryProbe>,
    pub(super) terminator: Arc<dyn Terminator>,
    pub(super) watchdog: Watchdog,
    pub(super) flags: ControlFlags,
}

impl Worker {
    /// Control flags shared with the signal listener.
    pub fn flags(&self) -> &ControlFlags {
        &self.flags
    }

    pub fn watchdog_enabled(&self) -> bool {
        self.watchdog.is_enabled()
    }

    /// Run jobs from `queues` (comma separated, highest priority first) until
    /// the worker has to stop, and return the status to exit with.
    ///
    /// The only error is an unresolvable connection; job failures are
    /// reported and never end the loop.
    pub async fn daemon(
        &self,
        connection: &str,
        queues: &str,
        options: &WorkerOptions,
    ) -> Result<WorkerExit, WorkerError> {
        let queue = self.manager.connection(connection)?;
        let last_restart = self.last_restart().await;

        info!(%connection, %queues, ?options, "worker started");

        loop {
            let job = self.next_job(queue.as_ref(), queues).await;

            self.register_timeout(job.as_deref(), options);

            if self.daemon_should_run(connection, queues, options).await {
                match job {
                    Some(job) => self.run_job(connection, job, options).await,
                    None => self.sleep(options.sleep_duration()).await,
                }
            }

            if let Some(exit) = self.stop_if_necessary(options, last_restart).await {
                return Ok(exit);
            }
        }
    }

    /// Process at most one job, then return (`--once`).
    pub async fn run_next_job(
        &self,
        connection: &str,
        queues: &str,
        options: &WorkerOptions,
    ) -> Result<(), WorkerError> {
        let queue = self.manager.connection(connection)?;

        if self.manager.is_down_for_maintenance() && !options.force {
            info!("application is down for maintenance; not running a job");
            return Ok(());
        }

        match self.next_job(queue.as_ref(), queues).await {
            Some(job) => {
                self.register_timeout(Some(job.as_ref()), options);
                self.run_job(connection, job, options).await;
                self.watchdog.disarm();
            }
            None => self.sleep(options.sleep_duration()).await,
        }
        Ok(())
    }

    /// Run one job through the state machine.
    ///
    /// On failure the job has already been released or permanently failed
    /// when the error comes back; the error carries the original cause.
    #[instrument(
        name = "process",
        skip_all,
        fields(%connection, job_id = %job.id(), job = %job.name(), attempts = job.attempts())
    )]
    pub async fn process(
        &self,
        connection: &str,
        job: &mut dyn Job,
        options: &WorkerOptions,
    ) -> Result<JobState, WorkerError> {
        self.raise(WorkerEvent::JobProcessing {
            connection: connection.to_string(),
            job: job.describe(),
        })
        .await;

        let exhausted = self
            .mark_job_as_failed_if_already_exceeds_max_attempts(connection, job, options)
            .await;
        let already_failed = exhausted.is_err();

        let outcome = match exhausted {
            Err(cause) => Err(cause),
            Ok(()) => match AssertUnwindSafe(job.fire()).catch_unwind().await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(error)) => Err(FailureCause::from_error(error)),
                Err(panic) => Err(FailureCause::from_panic(panic)),
            },
        };

        match outcome {
            Ok(()) => {
                self.raise(WorkerEvent::JobProcessed {
                    connection: connection.to_string(),
                    job: job.describe(),
                })
                .await;
                Ok(JobState::Succeeded)
            }
            Err(cause) => Err(self
                .handle_job_exception(connection, job, options, cause, already_failed)
                .await),
        }
    }

    /// Permanently fail `job`: mark it failed and, unless something already
    /// deleted it, delete it, call its `failed` hook and publish `JobFailed`.
    /// A failed delete is reported and stops there: no hook, no event.
    ///
    /// Without a cause the job counts as manually failed.
    pub async fn fail_job(&self, connection: &str, job: &mut dyn Job, cause: Option<FailureCause>) {
        job.mark_as_failed();

        if job.is_deleted() {
            return;
        }

        let cause = cause.unwrap_or(FailureCause::ManuallyFailed);

        if let Err(error) = job.delete().await {
            warn!(job_id = %job.id(), %error, "could not delete failed job");
            self.reporter.report(&error);
            return;
        }

        if let Err(error) = job.failed(&cause).await {
            warn!(job_id = %job.id(), %error, "failed hook raised");
            self.reporter.report(error.as_ref());
        }

        self.raise(WorkerEvent::JobFailed {
            connection: connection.to_string(),
            job: job.describe(),
            cause,
        })
        .await;
    }

    /// Publish `WorkerStopping` and hand back the status to exit with.
    pub async fn stop(&self, status: WorkerExit) -> WorkerExit {
        self.watchdog.disarm();
        self.raise(WorkerEvent::WorkerStopping {
            status: status.code(),
        })
        .await;
        status
    }

    /// Terminate the process right away. No events, no cleanup.
    pub fn kill(&self, status: WorkerExit) {
        self.terminator.kill(status);
    }

    async fn next_job(&self, queue: &dyn Queue, queues: &str) -> Option<Box<dyn Job>> {
        for name in queues.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match queue.pop(name).await {
                Ok(Some(job)) => return Some(job),
                Ok(None) => {}
                Err(error) => {
                    warn!(queue = name, %error, "pop failed");
                    self.reporter.report(&error);
                }
            }
        }
        None
    }

    fn register_timeout(&self, job: Option<&dyn Job>, options: &WorkerOptions) {
        let timeout = job
            .and_then(|j| j.timeout())
            .unwrap_or(Duration::from_secs(options.timeout));
        self.watchdog.arm(timeout + options.sleep_duration());
    }

    async fn daemon_should_run(&self, connection: &str, queues: &str, options: &WorkerOptions) -> bool {
        let down = self.manager.is_down_for_maintenance() && !options.force;
        let paused = self.flags.is_paused();
        let stopped = !down
            && !paused
            && self
                .raise(WorkerEvent::Looping {
                    connection: connection.to_string(),
                    queues: queues.to_string(),
                })
                .await
                .is_stopped();

        if down || paused || stopped {
            debug!(down, paused, stopped, "not running jobs this iteration");
            self.sleep(GATED_SLEEP).await;
            return false;
        }
        true
    }

    async fn run_job(&self, connection: &str, mut job: Box<dyn Job>, options: &WorkerOptions) {
        if let Err(error) = self.process(connection, job.as_mut(), options).await {
            self.reporter.report(&error);
        }
    }

    async fn mark_job_as_failed_if_already_exceeds_max_attempts(
        &self,
        connection: &str,
        job: &mut dyn Job,
        options: &WorkerOptions,
    ) -> Result<(), FailureCause> {
        let max_tries = effective_max_tries(job, options);
        if max_tries == 0 || job.attempts() <= max_tries {
            return Ok(());
        }

        let cause = FailureCause::MaxAttemptsExceeded {
            job: job.name().to_string(),
            attempts: job.attempts(),
            max_tries,
        };
        self.fail_job(connection, job, Some(cause.clone())).await;
        Err(cause)
    }

    async fn mark_job_as_failed_if_has_exceeded_max_attempts(
        &self,
        connection: &str,
        job: &mut dyn Job,
        options: &WorkerOptions,
        cause: &FailureCause,
    ) {
        let max_tries = effective_max_tries(job, options);
        if max_tries == 0 || job.attempts() < max_tries {
            return;
        }
        self.fail_job(connection, job, Some(cause.clone())).await;
    }

    async fn handle_job_exception(
        &self,
        connection: &str,
        job: &mut dyn Job,
        options: &WorkerOptions,
        cause: FailureCause,
        already_failed: bool,
    ) -> WorkerError {
        if !already_failed {
            self.mark_job_as_failed_if_has_exceeded_max_attempts(connection, job, options, &cause)
                .await;
        }

        self.raise(WorkerEvent::JobExceptionOccurred {
            connection: connection.to_string(),
            job: job.describe(),
            cause: cause.clone(),
        })
        .await;

        let state = if job.is_deleted() {
            JobState::PermanentlyFailed
        } else {
            if let Err(error) = job.release(options.retry_delay_duration()).await {
                warn!(job_id = %job.id(), %error, "could not release job");
                self.reporter.report(&error);
            }
            JobState::RetryScheduled
        };

        WorkerError::JobFailed {
            job: job.describe(),
            state,
            cause,
        }
    }

    async fn stop_if_necessary(
        &self,
        options: &WorkerOptions,
        last_restart: Option<RestartToken>,
    ) -> Option<WorkerExit> {
        if self.memory_exceeded(options.memory_limit) {
            warn!(limit_mb = options.memory_limit, "memory limit reached");
            return Some(self.stop(WorkerExit::MEMORY_EXCEEDED).await);
        }
        if self.flags.should_quit() {
            return Some(self.stop(WorkerExit::NORMAL).await);
        }
        if self.queue_should_restart(last_restart).await {
            info!("restart requested");
            return Some(self.stop(WorkerExit::NORMAL).await);
        }
        None
    }

    fn memory_exceeded(&self, limit_mb: u64) -> bool {
        self.memory
            .resident_megabytes()
            .is_some_and(|used| used >= limit_mb)
    }

    async fn last_restart(&self) -> Option<RestartToken> {
        let store = self.restart_store.as_ref()?;
        match store.last_restart().await {
            Ok(token) => token,
            Err(error) => {
                warn!(%error, "could not read restart token");
                self.reporter.report(&error);
                None
            }
        }
    }

    /// An unreadable store never triggers a restart.
    async fn queue_should_restart(&self, last_restart: Option<RestartToken>) -> bool {
        let Some(store) = self.restart_store.as_ref() else {
            return false;
        };
        match store.last_restart().await {
            Ok(current) => current != last_restart,
            Err(error) => {
                warn!(%error, "could not read restart token");
                self.reporter.report(&error);
                false
            }
        }
    }

    async fn raise(&self, event: WorkerEvent) -> Propagation {
        match self.events.publish(&event).await {
            Ok(propagation) => propagation,
            Err(error) => {
                warn!(event = event.kind().as_str(), %error, "event listener failed");
                self.reporter.report(&error);
                Propagation::Continue
            }
        }
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

fn effective_max_tries(job: &dyn Job, options: &WorkerOptions) -> u32 {
    job.max_tries().unwrap_or(options.max_tries)
}
