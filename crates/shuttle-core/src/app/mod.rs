//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **WorkerBuilder**: Worker の構築とワイヤリング
//! - **Worker**: デーモンループとジョブの状態遷移
//! - **Watchdog**: ジョブのタイムアウト監視（別スレッド）
//! - **ControlFlags**: SIGUSR2 / SIGCONT / SIGTERM による一時停止・再開・終了

pub mod builder;
pub mod signals;
pub mod watchdog;
pub mod worker;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, WorkerBuilder};
pub use self::signals::{ControlFlags, listen_for_signals};
pub use self::watchdog::Watchdog;
pub use self::worker::Worker;
