//! shuttle-core
//!
//! Core building blocks for the Shuttle queue worker.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（options, events, failure, state, errors, restart）
//! - **ports**: 抽象化レイヤー（Queue, Job, QueueManager, EventPublisher, など）
//! - **app**: アプリケーションロジック（builder, worker, watchdog, signals）
//! - **runtime**: ジョブ名 → ハンドラのレジストリ
//! - **impls**: 実装（InMemoryQueue, FileRestartStore など）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod runtime;

#[cfg(test)]
mod testing;
