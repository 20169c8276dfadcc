//! InMemoryQueueManager - connection name -> queue.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ports::{AlwaysUp, MaintenanceMode, Queue, QueueError, QueueManager};

pub struct InMemoryQueueManager {
    connections: HashMap<String, Arc<dyn Queue>>,
    maintenance: Arc<dyn MaintenanceMode>,
}

impl InMemoryQueueManager {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            maintenance: Arc::new(AlwaysUp),
        }
    }

    pub fn with_connection(mut self, name: impl Into<String>, queue: Arc<dyn Queue>) -> Self {
        self.connections.insert(name.into(), queue);
        self
    }

    pub fn with_maintenance(mut self, maintenance: Arc<dyn MaintenanceMode>) -> Self {
        self.maintenance = maintenance;
        self
    }
}

impl Default for InMemoryQueueManager {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueManager for InMemoryQueueManager {
    fn connection(&self, name: &str) -> Result<Arc<dyn Queue>, QueueError> {
        self.connections
            .get(name)
            .cloned()
            .ok_or_else(|| QueueError::UnknownConnection(name.to_string()))
    }

    fn is_down_for_maintenance(&self) -> bool {
        self.maintenance.is_down()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryQueue;
    use crate::runtime::HandlerRegistry;

    #[test]
    fn resolves_registered_connections_only() {
        let queue = Arc::new(InMemoryQueue::new(Arc::new(HandlerRegistry::new())));
        let manager = InMemoryQueueManager::new().with_connection("memory", queue);

        assert!(manager.connection("memory").is_ok());
        assert!(matches!(
            manager.connection("redis"),
            Err(QueueError::UnknownConnection(name)) if name == "redis"
        ));
        assert!(!manager.is_down_for_maintenance());
    }
}
