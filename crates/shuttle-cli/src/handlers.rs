//! Demo handlers for seeded jobs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shuttle_core::domain::{BoxError, FailureCause};
use shuttle_core::runtime::{HandlerRegistry, JobHandler, RegistryError};
use tracing::{info, warn};

/// Logs its payload.
pub(crate) struct EchoHandler;

#[async_trait]
impl JobHandler for EchoHandler {
    async fn handle(&self, payload: &serde_json::Value) -> Result<(), BoxError> {
        info!(%payload, "echo");
        Ok(())
    }
}

/// Sleeps for `payload.seconds` (default 1), to try out timeouts.
pub(crate) struct SleepHandler;

#[async_trait]
impl JobHandler for SleepHandler {
    async fn handle(&self, payload: &serde_json::Value) -> Result<(), BoxError> {
        let seconds = payload
            .get("seconds")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(1);
        tokio::time::sleep(Duration::from_secs(seconds)).await;
        Ok(())
    }
}

/// Always fails with `payload.message`, to try out retries.
pub(crate) struct FailHandler;

#[async_trait]
impl JobHandler for FailHandler {
    async fn handle(&self, payload: &serde_json::Value) -> Result<(), BoxError> {
        let message = payload
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("intentional failure");
        Err(message.to_string().into())
    }

    async fn failed(
        &self,
        payload: &serde_json::Value,
        cause: &FailureCause,
    ) -> Result<(), BoxError> {
        warn!(%payload, %cause, kind = cause.kind(), "fail job gave up");
        Ok(())
    }
}

pub(crate) fn demo_registry() -> Result<HandlerRegistry, RegistryError> {
    let mut registry = HandlerRegistry::new();
    registry.register("echo", Arc::new(EchoHandler))?;
    registry.register("sleep", Arc::new(SleepHandler))?;
    registry.register("fail", Arc::new(FailHandler))?;
    Ok(registry)
}
