//! InMemoryQueue - 開発用のキュー
//!
//! Named FIFO queues plus a delayed heap for released jobs. Reserved jobs that
//! are neither deleted nor released within `retry_after` become available
//! again, which is how a job skipped by a paused worker (or lost to a killed
//! one) finds its way back.

use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::{BoxError, FailureCause, JobId};
use crate::ports::{Job, Queue, QueueError};
use crate::runtime::HandlerRegistry;

/// Default visibility timeout of a reserved job.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(90);

/// How many deleted/failed jobs `state_of` still remembers.
const FINISHED_HISTORY: usize = 1024;

/// Record state inside the in-memory backend.
///
/// State transitions:
/// - Queued -> Reserved -> Deleted
/// - Queued -> Reserved -> Delayed -> Queued (released with a delay)
/// - Queued -> Reserved -> Queued (released without delay, or reservation expired)
/// - Queued -> Reserved -> Failed (deleted after being marked failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Queued,
    Reserved,
    Delayed,
    Deleted,
    Failed,
}

/// Counts of records per state, for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub queued: usize,
    pub reserved: usize,
    pub delayed: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// A job to push onto the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub name: String,

    #[serde(default)]
    pub payload: serde_json::Value,

    /// Overrides the worker's `max_tries`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tries: Option<u32>,

    /// Overrides the worker's `timeout`, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl NewJob {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
            max_tries: None,
            timeout: None,
        }
    }

    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = Some(max_tries);
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }
}

#[derive(Debug, Clone)]
struct JobRecord {
    queue: String,
    job: NewJob,
    state: RecordState,
    attempts: u32,
    reserved_until: Option<Instant>,
}

/// Delayed entry, ordered so the heap pops the earliest first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DelayedJob {
    available_at: Instant,
    job_id: JobId,
}

impl PartialOrd for DelayedJob {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedJob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.available_at.cmp(&self.available_at)
    }
}

/// `records` only holds live jobs (queued, reserved, delayed). Deleted and
/// failed jobs are dropped from it; they survive as totals and in a short
/// `finished` history.
struct InMemoryQueueState {
    records: HashMap<JobId, JobRecord>,
    ready: HashMap<String, VecDeque<JobId>>,
    delayed: BinaryHeap<DelayedJob>,
    reserved: HashSet<JobId>,
    finished: VecDeque<(JobId, RecordState)>,
    deleted_total: usize,
    failed_total: usize,
    retry_after: Duration,
}

impl InMemoryQueueState {
    fn new(retry_after: Duration) -> Self {
        Self {
            records: HashMap::new(),
            ready: HashMap::new(),
            delayed: BinaryHeap::new(),
            reserved: HashSet::new(),
            finished: VecDeque::new(),
            deleted_total: 0,
            failed_total: 0,
            retry_after,
        }
    }

    fn enqueue(&mut self, job_id: JobId) {
        self.reserved.remove(&job_id);
        if let Some(record) = self.records.get_mut(&job_id) {
            record.state = RecordState::Queued;
            record.reserved_until = None;
            self.ready
                .entry(record.queue.clone())
                .or_default()
                .push_back(job_id);
        }
    }

    fn delay(&mut self, job_id: JobId, available_at: Instant) {
        self.reserved.remove(&job_id);
        if let Some(record) = self.records.get_mut(&job_id) {
            record.state = RecordState::Delayed;
            record.reserved_until = None;
            self.delayed.push(DelayedJob {
                available_at,
                job_id,
            });
        }
    }

    /// Drop a deleted/failed job, keeping only its outcome.
    fn finish(&mut self, job_id: JobId, outcome: RecordState) {
        self.reserved.remove(&job_id);
        self.records.remove(&job_id);
        match outcome {
            RecordState::Failed => self.failed_total += 1,
            _ => self.deleted_total += 1,
        }
        if self.finished.len() == FINISHED_HISTORY {
            self.finished.pop_front();
        }
        self.finished.push_back((job_id, outcome));
    }

    fn state_of(&self, job_id: JobId) -> Option<RecordState> {
        self.records.get(&job_id).map(|r| r.state).or_else(|| {
            self.finished
                .iter()
                .rev()
                .find(|(id, _)| *id == job_id)
                .map(|(_, outcome)| *outcome)
        })
    }

    /// Move due delayed jobs and expired reservations back to their queues.
    fn promote(&mut self, now: Instant) {
        while let Some(entry) = self.delayed.peek() {
            if entry.available_at > now {
                break;
            }
            let Some(entry) = self.delayed.pop() else {
                break;
            };
            if self
                .records
                .get(&entry.job_id)
                .is_some_and(|r| r.state == RecordState::Delayed)
            {
                self.enqueue(entry.job_id);
            }
        }

        let expired: Vec<JobId> = self
            .reserved
            .iter()
            .filter(|id| {
                self.records
                    .get(id)
                    .and_then(|r| r.reserved_until)
                    .is_some_and(|t| t <= now)
            })
            .copied()
            .collect();
        for job_id in expired {
            self.enqueue(job_id);
        }
    }

    fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts {
            deleted: self.deleted_total,
            failed: self.failed_total,
            ..QueueCounts::default()
        };
        for record in self.records.values() {
            match record.state {
                RecordState::Queued => counts.queued += 1,
                RecordState::Reserved => counts.reserved += 1,
                RecordState::Delayed => counts.delayed += 1,
                RecordState::Deleted | RecordState::Failed => {}
            }
        }
        counts
    }
}

/// In-memory queue implementation.
pub struct InMemoryQueue {
    state: Arc<Mutex<InMemoryQueueState>>,
    registry: Arc<HandlerRegistry>,
}

impl InMemoryQueue {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_retry_after(registry, DEFAULT_RETRY_AFTER)
    }

    pub fn with_retry_after(registry: Arc<HandlerRegistry>, retry_after: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryQueueState::new(retry_after))),
            registry,
        }
    }

    /// Push a job onto `queue`, available immediately.
    pub async fn push(&self, queue: &str, job: NewJob) -> JobId {
        let job_id = JobId::generate();
        let mut state = self.state.lock().await;
        state.records.insert(
            job_id,
            JobRecord {
                queue: queue.to_string(),
                job,
                state: RecordState::Queued,
                attempts: 0,
                reserved_until: None,
            },
        );
        state.enqueue(job_id);
        job_id
    }

    /// Push a job onto `queue`, available after `delay`.
    pub async fn later(&self, queue: &str, job: NewJob, delay: Duration) -> JobId {
        let job_id = JobId::generate();
        let mut state = self.state.lock().await;
        state.records.insert(
            job_id,
            JobRecord {
                queue: queue.to_string(),
                job,
                state: RecordState::Delayed,
                attempts: 0,
                reserved_until: None,
            },
        );
        state.delayed.push(DelayedJob {
            available_at: Instant::now() + delay,
            job_id,
        });
        job_id
    }

    /// Number of jobs waiting on `queue` right now.
    pub async fn size(&self, queue: &str) -> usize {
        let state = self.state.lock().await;
        state.ready.get(queue).map_or(0, VecDeque::len)
    }

    pub async fn counts_by_state(&self) -> QueueCounts {
        let state = self.state.lock().await;
        state.counts()
    }

    pub async fn state_of(&self, job_id: JobId) -> Option<RecordState> {
        let state = self.state.lock().await;
        state.state_of(job_id)
    }

    pub async fn attempts_of(&self, job_id: JobId) -> Option<u32> {
        let state = self.state.lock().await;
        state.records.get(&job_id).map(|r| r.attempts)
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    async fn pop(&self, queue: &str) -> Result<Option<Box<dyn Job>>, QueueError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        state.promote(now);
        let retry_after = state.retry_after;

        loop {
            let Some(job_id) = state.ready.get_mut(queue).and_then(VecDeque::pop_front) else {
                return Ok(None);
            };
            let Some(record) = state.records.get_mut(&job_id) else {
                continue;
            };
            // 同じ ID が二重に積まれていた場合の古いエントリ
            if record.state != RecordState::Queued {
                continue;
            }

            record.state = RecordState::Reserved;
            record.attempts += 1;
            record.reserved_until = Some(now + retry_after);

            let job = InMemoryJob {
                job_id,
                queue: record.queue.clone(),
                job: record.job.clone(),
                attempts: record.attempts,
                deleted: false,
                failed: false,
                state: Arc::clone(&self.state),
                registry: Arc::clone(&self.registry),
            };
            state.reserved.insert(job_id);
            return Ok(Some(Box::new(job)));
        }
    }
}

/// A job reserved from [`InMemoryQueue`].
///
/// `fire()` dispatches to the registry by job name and deletes the job when the
/// handler succeeds.
pub struct InMemoryJob {
    job_id: JobId,
    queue: String,
    job: NewJob,
    attempts: u32,
    deleted: bool,
    failed: bool,
    state: Arc<Mutex<InMemoryQueueState>>,
    registry: Arc<HandlerRegistry>,
}

impl InMemoryJob {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.job.payload
    }

    fn ensure_not_deleted(&self) -> Result<(), QueueError> {
        if self.deleted {
            return Err(QueueError::AlreadyDeleted(self.job_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Job for InMemoryJob {
    fn id(&self) -> String {
        self.job_id.to_string()
    }

    fn name(&self) -> &str {
        &self.job.name
    }

    fn queue(&self) -> &str {
        &self.queue
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }

    fn timeout(&self) -> Option<Duration> {
        self.job.timeout.map(Duration::from_secs)
    }

    fn max_tries(&self) -> Option<u32> {
        self.job.max_tries
    }

    async fn fire(&mut self) -> Result<(), BoxError> {
        self.registry
            .execute(&self.job.name, &self.job.payload)
            .await?;
        self.delete().await?;
        Ok(())
    }

    fn mark_as_failed(&mut self) {
        self.failed = true;
    }

    fn has_failed(&self) -> bool {
        self.failed
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    async fn delete(&mut self) -> Result<(), QueueError> {
        self.ensure_not_deleted()?;
        let mut state = self.state.lock().await;
        if !state.records.contains_key(&self.job_id) {
            return Err(QueueError::OperationFailed(format!("{} vanished", self.job_id)));
        }
        let outcome = if self.failed {
            RecordState::Failed
        } else {
            RecordState::Deleted
        };
        state.finish(self.job_id, outcome);
        self.deleted = true;
        Ok(())
    }

    async fn release(&mut self, delay: Duration) -> Result<(), QueueError> {
        self.ensure_not_deleted()?;
        let mut state = self.state.lock().await;
        if !state.records.contains_key(&self.job_id) {
            return Err(QueueError::OperationFailed(format!("{} vanished", self.job_id)));
        }

        if delay.is_zero() {
            state.enqueue(self.job_id);
        } else {
            state.delay(self.job_id, Instant::now() + delay);
        }
        Ok(())
    }

    async fn failed(&mut self, cause: &FailureCause) -> Result<(), BoxError> {
        self.registry
            .failed(&self.job.name, &self.job.payload, cause)
            .await
    }
}
