//! WorkerBuilder - Worker の構築とワイヤリング
//!
//! # 方針
//! - 未指定のポートは本番向けの実装で埋める（tracing, sysinfo, process::exit）
//! - 起動時検証（Fail-fast）: QueueManager 未指定、解決できない接続名は build() で弾く

use std::sync::Arc;

use crate::impls::{SysinfoMemoryProbe, TracingErrorReporter, TracingEventPublisher};
use crate::ports::{
    ErrorReporter, EventPublisher, MemoryProbe, ProcessTerminator, QueueManager,
    RestartSignalStore, Terminator,
};

use super::signals::ControlFlags;
use super::watchdog::Watchdog;
use super::worker::Worker;

/// WorkerBuilder は Worker を組み立てる
///
/// # 使用例
/// ```ignore
/// let worker = WorkerBuilder::new()
///     .queue_manager(Arc::new(manager))
///     .restart_store(Arc::new(FileRestartStore::new("storage/restart")))
///     .expect_connections(&["memory"])
///     .build()?;
/// ```
pub struct WorkerBuilder {
    manager: Option<Arc<dyn QueueManager>>,
    events: Option<Arc<dyn EventPublisher>>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    restart_store: Option<Arc<dyn RestartSignalStore>>,
    memory: Option<Arc<dyn MemoryProbe>>,
    terminator: Option<Arc<dyn Terminator>>,
    flags: ControlFlags,
    watchdog: bool,
    expected_connections: Vec<String>,
}

/// BuildError は Worker 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no queue manager configured")]
    MissingQueueManager,

    #[error("Unknown connections: {0:?}. These connections were expected but cannot be resolved.")]
    UnknownConnections(Vec<String>),
}

impl WorkerBuilder {
    pub fn new() -> Self {
        Self {
            manager: None,
            events: None,
            reporter: None,
            restart_store: None,
            memory: None,
            terminator: None,
            flags: ControlFlags::new(),
            watchdog: true,
            expected_connections: Vec::new(),
        }
    }

    pub fn queue_manager(mut self, manager: Arc<dyn QueueManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// 再起動トークンの保存先。未指定なら再起動シグナルは無視される
    pub fn restart_store(mut self, store: Arc<dyn RestartSignalStore>) -> Self {
        self.restart_store = Some(store);
        self
    }

    pub fn memory_probe(mut self, memory: Arc<dyn MemoryProbe>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn terminator(mut self, terminator: Arc<dyn Terminator>) -> Self {
        self.terminator = Some(terminator);
        self
    }

    /// Share flags with a signal listener started elsewhere.
    pub fn control_flags(mut self, flags: ControlFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Don't start the watchdog thread; job timeouts are not enforced.
    pub fn without_watchdog(mut self) -> Self {
        self.watchdog = false;
        self
    }

    /// build() 時に解決できることを確認する接続名
    pub fn expect_connections(mut self, names: &[&str]) -> Self {
        self.expected_connections = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn build(self) -> Result<Worker, BuildError> {
        let manager = self.manager.ok_or(BuildError::MissingQueueManager)?;

        let unknown: Vec<String> = self
            .expected_connections
            .into_iter()
            .filter(|name| manager.connection(name).is_err())
            .collect();
        if !unknown.is_empty() {
            return Err(BuildError::UnknownConnections(unknown));
        }

        let terminator = self
            .terminator
            .unwrap_or_else(|| Arc::new(ProcessTerminator));
        let watchdog = if self.watchdog {
            Watchdog::spawn(Arc::clone(&terminator))
        } else {
            Watchdog::disabled()
        };

        Ok(Worker {
            manager,
            events: self
                .events
                .unwrap_or_else(|| Arc::new(TracingEventPublisher)),
            reporter: self
                .reporter
                .unwrap_or_else(|| Arc::new(TracingErrorReporter)),
            restart_store: self.restart_store,
            memory: self
                .memory
                .unwrap_or_else(|| Arc::new(SysinfoMemoryProbe::new())),
            terminator,
            watchdog,
            flags: self.flags,
        })
    }
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
