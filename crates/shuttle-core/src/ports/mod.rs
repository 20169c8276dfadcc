//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! Worker はここにある trait だけに依存し、キューの実装やイベントの
//! 配信先、プロセス終了の方法を知りません。

pub mod error_reporter;
pub mod event_sink;
pub mod maintenance;
pub mod memory;
pub mod queue;
pub mod restart_store;
pub mod terminator;

pub use self::error_reporter::ErrorReporter;
pub use self::event_sink::{EventPublisher, PublishError};
pub use self::maintenance::{AlwaysUp, MaintenanceMode};
pub use self::memory::MemoryProbe;
pub use self::queue::{Job, Queue, QueueError, QueueManager};
pub use self::restart_store::{RestartSignalStore, StoreError};
pub use self::terminator::{ProcessTerminator, Terminator};
