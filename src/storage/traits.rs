//! Core trait definitions for the coordination store

use async_trait::async_trait;

use super::error::StorageResult;
use super::types::HealthStatus;

/// Shared key-value store used to hand state between pipeline stages.
///
/// Values are opaque strings; every stage writes JSON. Keys are namespaced by
/// node id by the caller (see [`super::keys::NodeKeys`]).
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Read a value, `None` when the key does not exist
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: String) -> StorageResult<()>;

    /// Delete several keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> StorageResult<usize>;

    /// Check the health of the backend
    async fn health_check(&self) -> StorageResult<HealthStatus>;
}
