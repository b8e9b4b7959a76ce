//! Redis coordination store backend

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::storage::{
    config::StorageConfig,
    error::{StorageError, StorageResult},
    traits::CoordinationStore,
    types::{ConnectionStatus, HealthStatus},
};

/// Redis store backend
pub struct RedisBackend {
    pool: Pool,
    timeout: Duration,
}

impl RedisBackend {
    /// Create a pooled Redis backend and verify the connection
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StorageError::configuration("Redis backend requires store.url"))?;

        info!("Initializing Redis backend");

        let mut pool_config = Config::from_url(url);
        pool_config.pool = Some(deadpool_redis::PoolConfig::new(config.pool_size.max(1)));

        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StorageError::connection(format!("Failed to create Redis pool: {}", e)))?;

        let backend = Self {
            pool,
            timeout: config.timeout,
        };

        // Fail fast on a bad URL instead of at the first stage step
        backend.connection().await?;

        Ok(backend)
    }

    async fn connection(&self) -> StorageResult<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| StorageError::connection(format!("Failed to connect to Redis: {}", e)))
    }

    async fn with_timeout<T, F>(&self, fut: F) -> StorageResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StorageError::backend),
            Err(_) => Err(StorageError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl CoordinationStore for RedisBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        debug!("GET {}", key);
        let mut conn = self.connection().await?;
        self.with_timeout(conn.get::<_, Option<String>>(key)).await
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        debug!("SET {} ({} bytes)", key, value.len());
        let mut conn = self.connection().await?;
        self.with_timeout(conn.set::<_, _, ()>(key, value)).await
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        debug!("DEL {:?}", keys);
        let mut conn = self.connection().await?;
        self.with_timeout(conn.del::<_, usize>(keys.to_vec())).await
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let started = Instant::now();
        let result = match self.connection().await {
            Ok(mut conn) => {
                let ping = async {
                    let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
                    Ok::<_, redis::RedisError>(pong)
                };
                self.with_timeout(ping).await
            }
            Err(e) => Err(e),
        };

        let (healthy, connection_status, errors) = match result {
            Ok(_) => (true, ConnectionStatus::Connected, vec![]),
            Err(e) => (false, ConnectionStatus::Disconnected, vec![e.to_string()]),
        };

        Ok(HealthStatus {
            healthy,
            backend_type: "redis".to_string(),
            connection_status,
            latency_ms: started.elapsed().as_millis() as u64,
            errors,
        })
    }
}
