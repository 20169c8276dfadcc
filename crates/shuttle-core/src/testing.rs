//! Test doubles for the ports.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{
    BoxError, EventKind, FailureCause, Propagation, RestartToken, WorkerEvent, WorkerExit,
};
use crate::ports::{
    ErrorReporter, EventPublisher, Job, MemoryProbe, PublishError, Queue, QueueError,
    QueueManager, RestartSignalStore, StoreError, Terminator,
};

#[derive(Debug, Default)]
pub struct RecordingTerminator {
    kills: Mutex<Vec<WorkerExit>>,
}

impl RecordingTerminator {
    pub fn kills(&self) -> Vec<WorkerExit> {
        self.kills.lock().clone()
    }
}

impl Terminator for RecordingTerminator {
    fn kill(&self, status: WorkerExit) {
        self.kills.lock().push(status);
    }
}

/// Records every event; can fail on one kind and stop `Looping`.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<WorkerEvent>>,
    failing: Mutex<HashSet<EventKind>>,
    stop_looping: AtomicBool,
}

impl RecordingPublisher {
    pub fn failing_on(kinds: &[EventKind]) -> Self {
        let publisher = Self::default();
        publisher.failing.lock().extend(kinds.iter().copied());
        publisher
    }

    pub fn stop_looping(&self, stop: bool) {
        self.stop_looping.store(stop, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<WorkerEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(WorkerEvent::kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &WorkerEvent) -> Result<Propagation, PublishError> {
        self.events.lock().push(event.clone());
        if self.failing.lock().contains(&event.kind()) {
            return Err(PublishError::new(event.kind(), "listener exploded"));
        }
        if event.kind() == EventKind::Looping && self.stop_looping.load(Ordering::SeqCst) {
            return Ok(Propagation::Stop);
        }
        Ok(Propagation::Continue)
    }
}

#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: &(dyn std::error::Error + 'static)) {
        self.reports.lock().push(error.to_string());
    }
}

/// Returns queued readings in order, then `fallback` forever.
#[derive(Debug)]
pub struct ScriptedMemory {
    readings: Mutex<VecDeque<u64>>,
    fallback: u64,
}

impl ScriptedMemory {
    pub fn fixed(megabytes: u64) -> Self {
        Self::sequence(&[], megabytes)
    }

    pub fn sequence(readings: &[u64], fallback: u64) -> Self {
        Self {
            readings: Mutex::new(readings.iter().copied().collect()),
            fallback,
        }
    }
}

impl MemoryProbe for ScriptedMemory {
    fn resident_megabytes(&self) -> Option<u64> {
        Some(self.readings.lock().pop_front().unwrap_or(self.fallback))
    }
}

/// Returns queued tokens in order, then repeats the last one.
#[derive(Debug, Default)]
pub struct ScriptedRestartStore {
    tokens: Mutex<VecDeque<Option<RestartToken>>>,
    last: Mutex<Option<RestartToken>>,
    reads: AtomicU32,
}

impl ScriptedRestartStore {
    pub fn sequence(tokens: &[Option<RestartToken>]) -> Self {
        let store = Self::default();
        store.tokens.lock().extend(tokens.iter().copied());
        store
    }

    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RestartSignalStore for ScriptedRestartStore {
    async fn last_restart(&self) -> Result<Option<RestartToken>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock();
        if let Some(next) = self.tokens.lock().pop_front() {
            *last = next;
        }
        Ok(*last)
    }

    async fn signal_restart(&self, token: RestartToken) -> Result<(), StoreError> {
        self.tokens.lock().push_back(Some(token));
        Ok(())
    }
}

/// What a [`FakeJob`] does when fired.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Succeed,
    Fail(&'static str),
    Panic(&'static str),
    /// Blocks the executor thread, like a stuck synchronous call.
    Block(Duration),
}

/// Side effects observed on a [`FakeJob`], shared with the test.
#[derive(Debug, Default)]
pub struct JobLog {
    pub fired: AtomicU32,
    pub deleted: AtomicU32,
    pub delete_attempts: AtomicU32,
    pub failed_hook: AtomicU32,
    pub marked_failed: AtomicU32,
    pub releases: Mutex<Vec<Duration>>,
    pub failed_causes: Mutex<Vec<String>>,
}

impl JobLog {
    pub fn fired(&self) -> u32 {
        self.fired.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> u32 {
        self.deleted.load(Ordering::SeqCst)
    }

    pub fn delete_attempts(&self) -> u32 {
        self.delete_attempts.load(Ordering::SeqCst)
    }

    pub fn failed_hook(&self) -> u32 {
        self.failed_hook.load(Ordering::SeqCst)
    }

    pub fn marked_failed(&self) -> u32 {
        self.marked_failed.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> Vec<Duration> {
        self.releases.lock().clone()
    }
}

#[derive(Debug)]
pub struct FakeJob {
    name: String,
    queue: String,
    attempts: u32,
    max_tries: Option<u32>,
    timeout: Option<Duration>,
    behavior: Behavior,
    deleted: bool,
    failed: bool,
    refuse_delete: bool,
    log: Arc<JobLog>,
}

impl FakeJob {
    pub fn new(name: &str, behavior: Behavior) -> (Self, Arc<JobLog>) {
        let log = Arc::new(JobLog::default());
        let job = Self {
            name: name.to_string(),
            queue: "default".to_string(),
            attempts: 1,
            max_tries: None,
            timeout: None,
            behavior,
            deleted: false,
            failed: false,
            refuse_delete: false,
            log: Arc::clone(&log),
        };
        (job, log)
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = Some(max_tries);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// `delete()` always fails, leaving the job in place.
    pub fn with_failing_delete(mut self) -> Self {
        self.refuse_delete = true;
        self
    }

    pub fn on_queue(mut self, queue: &str) -> Self {
        self.queue = queue.to_string();
        self
    }
}

#[async_trait]
impl Job for FakeJob {
    fn id(&self) -> String {
        format!("fake-{}", self.name)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn queue(&self) -> &str {
        &self.queue
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn max_tries(&self) -> Option<u32> {
        self.max_tries
    }

    async fn fire(&mut self) -> Result<(), BoxError> {
        self.log.fired.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail(message) => Err(message.into()),
            Behavior::Panic(message) => panic!("{message}"),
            Behavior::Block(duration) => {
                std::thread::sleep(duration);
                Ok(())
            }
        }
    }

    fn mark_as_failed(&mut self) {
        self.failed = true;
        self.log.marked_failed.fetch_add(1, Ordering::SeqCst);
    }

    fn has_failed(&self) -> bool {
        self.failed
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    async fn delete(&mut self) -> Result<(), QueueError> {
        if self.deleted {
            return Err(QueueError::AlreadyDeleted(self.id()));
        }
        self.log.delete_attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse_delete {
            return Err(QueueError::OperationFailed("delete refused".to_string()));
        }
        self.deleted = true;
        self.log.deleted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn release(&mut self, delay: Duration) -> Result<(), QueueError> {
        if self.deleted {
            return Err(QueueError::AlreadyDeleted(self.id()));
        }
        self.log.releases.lock().push(delay);
        Ok(())
    }

    async fn failed(&mut self, cause: &FailureCause) -> Result<(), BoxError> {
        self.log.failed_hook.fetch_add(1, Ordering::SeqCst);
        self.log.failed_causes.lock().push(cause.to_string());
        Ok(())
    }
}

/// Queue of prepared jobs; queue names listed as broken fail on pop.
#[derive(Default)]
pub struct FakeQueue {
    jobs: Mutex<HashMap<String, VecDeque<FakeJob>>>,
    broken: Mutex<HashSet<String>>,
    pops: Mutex<Vec<String>>,
}

impl FakeQueue {
    pub fn push(&self, queue: &str, job: FakeJob) {
        self.jobs
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push_back(job.on_queue(queue));
    }

    pub fn break_queue(&self, queue: &str) {
        self.broken.lock().insert(queue.to_string());
    }

    pub fn pops(&self) -> Vec<String> {
        self.pops.lock().clone()
    }
}

#[async_trait]
impl Queue for FakeQueue {
    async fn pop(&self, queue: &str) -> Result<Option<Box<dyn Job>>, QueueError> {
        self.pops.lock().push(queue.to_string());
        if self.broken.lock().contains(queue) {
            return Err(QueueError::OperationFailed(format!("{queue} is unreachable")));
        }
        let job = self.jobs.lock().get_mut(queue).and_then(VecDeque::pop_front);
        Ok(job.map(|j| Box::new(j) as Box<dyn Job>))
    }
}

pub struct FakeManager {
    queue: Arc<FakeQueue>,
    down: AtomicBool,
}

impl FakeManager {
    pub fn new(queue: Arc<FakeQueue>) -> Self {
        Self {
            queue,
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

impl QueueManager for FakeManager {
    fn connection(&self, name: &str) -> Result<Arc<dyn Queue>, QueueError> {
        if name == "fake" {
            Ok(Arc::clone(&self.queue) as Arc<dyn Queue>)
        } else {
            Err(QueueError::UnknownConnection(name.to_string()))
        }
    }

    fn is_down_for_maintenance(&self) -> bool {
        self.down.load(Ordering::SeqCst)
    }
}
