//! Restart stores: file-backed (production) and in-memory (tests, embedding).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::domain::RestartToken;
use crate::ports::{RestartSignalStore, StoreError};

/// Keeps the restart token as an RFC 3339 timestamp in a file.
///
/// A missing file means no restart was ever requested.
#[derive(Debug, Clone)]
pub struct FileRestartStore {
    path: PathBuf,
}

impl FileRestartStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RestartSignalStore for FileRestartStore {
    async fn last_restart(&self) -> Result<Option<RestartToken>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let trimmed = contents.trim();
        let timestamp = DateTime::parse_from_rfc3339(trimmed)
            .map_err(|e| StoreError::Malformed(format!("{trimmed:?}: {e}")))?;
        Ok(Some(RestartToken::at(timestamp.with_timezone(&Utc))))
    }

    async fn signal_restart(&self, token: RestartToken) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, format!("{token}\n")).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRestartStore {
    token: Mutex<Option<RestartToken>>,
}

impl InMemoryRestartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RestartSignalStore for InMemoryRestartStore {
    async fn last_restart(&self) -> Result<Option<RestartToken>, StoreError> {
        Ok(*self.token.lock())
    }

    async fn signal_restart(&self, token: RestartToken) -> Result<(), StoreError> {
        *self.token.lock() = Some(token);
        Ok(())
    }
}
