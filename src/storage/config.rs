//! Coordination store configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Store backend type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Process-local map (single node runs and tests)
    #[default]
    Memory,
    /// Shared Redis instance (requires the `redis` feature)
    Redis,
}

/// Main store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendType,

    /// Connection URL, e.g. `redis://127.0.0.1:6379/0`
    #[serde(default)]
    pub url: Option<String>,

    /// Prefix prepended to every key
    #[serde(default)]
    pub key_prefix: String,

    /// Connection pool size for networked backends
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Default timeout for store operations
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

fn default_pool_size() -> usize {
    4
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            url: None,
            key_prefix: String::new(),
            pool_size: default_pool_size(),
            timeout: default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_table() {
        let config: StorageConfig = toml::from_str("").unwrap();
        assert_eq!(config.backend, BackendType::Memory);
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_redis_section() {
        let config: StorageConfig = toml::from_str(
            r#"
            backend = "redis"
            url = "redis://cache:6379/2"
            key_prefix = "dprep:"
            timeout = "3s"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, BackendType::Redis);
        assert_eq!(config.url.as_deref(), Some("redis://cache:6379/2"));
        assert_eq!(config.timeout, Duration::from_secs(3));
    }
}
