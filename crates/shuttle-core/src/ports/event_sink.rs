//! EventPublisher port - ライフサイクルイベントの通知

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{EventKind, Propagation, WorkerEvent};

#[derive(Debug, Error)]
#[error("listener for {} failed: {message}", .kind.as_str())]
pub struct PublishError {
    pub kind: EventKind,
    pub message: String,
}

impl PublishError {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// EventPublisher はワーカーのイベントを配信する
///
/// Returning [`Propagation::Stop`] for a `Looping` event pauses execution of
/// the popped job for that iteration.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &WorkerEvent) -> Result<Propagation, PublishError>;
}
