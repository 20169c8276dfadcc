//! RestartSignalStore port - 再起動要求のタイムスタンプ

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::RestartToken;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("restart store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("restart token is malformed: {0}")]
    Malformed(String),
}

/// Where `shuttle restart` leaves its token and workers look for it.
#[async_trait]
pub trait RestartSignalStore: Send + Sync {
    /// The last restart token, or `None` if no restart was ever requested.
    async fn last_restart(&self) -> Result<Option<RestartToken>, StoreError>;

    /// Record a restart request.
    async fn signal_restart(&self, token: RestartToken) -> Result<(), StoreError>;
}
