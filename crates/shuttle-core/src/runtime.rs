use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BoxError, FailureCause};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("handler not found for job '{0}'")]
    HandlerNotFound(String),

    #[error("duplicate handler for job '{0}'")]
    DuplicateHandler(String),
}

/// Business logic for one job name.
///
/// The payload is handed over as JSON so the handler can decode it as it likes.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, payload: &serde_json::Value) -> Result<(), BoxError>;

    /// Called once when a job is permanently failed.
    async fn failed(
        &self,
        _payload: &serde_json::Value,
        _cause: &FailureCause,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Registry of handlers (job name -> handler).
///
/// Design:
/// - Built during initialization (mutable).
/// - Used during runtime (immutable, shared behind `Arc`).
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a job name. Registering the same name twice is an error.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn JobHandler>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(RegistryError::DuplicateHandler(name));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn JobHandler>> {
        self.handlers.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler registered for `name`.
    pub async fn execute(&self, name: &str, payload: &serde_json::Value) -> Result<(), BoxError> {
        let handler = self
            .get(name)
            .ok_or_else(|| RegistryError::HandlerNotFound(name.to_string()))?;
        handler.handle(payload).await
    }

    /// Run the `failed` hook of the handler registered for `name`.
    pub async fn failed(
        &self,
        name: &str,
        payload: &serde_json::Value,
        cause: &FailureCause,
    ) -> Result<(), BoxError> {
        let handler = self
            .get(name)
            .ok_or_else(|| RegistryError::HandlerNotFound(name.to_string()))?;
        handler.failed(payload, cause).await
    }
}
