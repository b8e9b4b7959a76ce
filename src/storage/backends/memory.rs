//! In-memory coordination store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::storage::{
    error::StorageResult,
    traits::CoordinationStore,
    types::{ConnectionStatus, HealthStatus},
};

/// In-memory store backend for single-node runs and testing
#[derive(Clone, Default)]
pub struct MemoryBackend {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl CoordinationStore for MemoryBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<usize> {
        let mut values = self.values.write().await;
        Ok(keys.iter().filter(|k| values.remove(*k).is_some()).count())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: true,
            backend_type: "memory".to_string(),
            connection_status: ConnectionStatus::Connected,
            latency_ms: 0,
            errors: vec![],
        })
    }
}
