//! Storage factory for creating coordination store instances

use std::sync::Arc;

use super::backends::MemoryBackend;
#[cfg(feature = "redis")]
use super::backends::RedisBackend;
use super::config::{BackendType, StorageConfig};
use super::error::StorageResult;
use super::traits::CoordinationStore;

/// Factory for creating store instances
pub struct StorageFactory;

impl StorageFactory {
    /// Create a store from explicit configuration
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn CoordinationStore>> {
        match &config.backend {
            BackendType::Memory => Ok(Arc::new(MemoryBackend::new())),
            #[cfg(feature = "redis")]
            BackendType::Redis => {
                let backend = RedisBackend::new(config).await?;
                Ok(Arc::new(backend))
            }
            #[cfg(not(feature = "redis"))]
            BackendType::Redis => Err(super::error::StorageError::configuration(
                "Redis backend not enabled. Enable with --features redis",
            )),
        }
    }
}
