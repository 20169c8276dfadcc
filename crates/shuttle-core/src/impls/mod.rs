//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryQueue / InMemoryQueueManager**: 開発用のキュー
//! - **TracingEventPublisher / TracingErrorReporter**: ログへの出力
//! - **FileRestartStore / InMemoryRestartStore**: 再起動トークン
//! - **FileMaintenanceMode**: マーカーファイルによるメンテナンスモード
//! - **SysinfoMemoryProbe**: プロセスのメモリ使用量

pub mod inmem_queue;
pub mod maintenance;
pub mod manager;
pub mod restart_store;
pub mod sysinfo_memory;
pub mod tracing_sink;

pub use self::inmem_queue::{InMemoryJob, InMemoryQueue, NewJob, QueueCounts, RecordState};
pub use self::maintenance::FileMaintenanceMode;
pub use self::manager::InMemoryQueueManager;
pub use self::restart_store::{FileRestartStore, InMemoryRestartStore};
pub use self::sysinfo_memory::SysinfoMemoryProbe;
pub use self::tracing_sink::{TracingErrorReporter, TracingEventPublisher};
