//! Typed, node-scoped view over the coordination store

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::error::StorageResult;
use super::keys::NodeKeys;
use super::traits::CoordinationStore;
use crate::model::{NodeId, NodeState, ProcessingRecord};

/// Reads and writes one node's stage handoff state as JSON
#[derive(Clone)]
pub struct NodeStore {
    store: Arc<dyn CoordinationStore>,
    keys: NodeKeys,
}

impl NodeStore {
    pub fn new(store: Arc<dyn CoordinationStore>, keys: NodeKeys) -> Self {
        Self { store, keys }
    }

    pub fn node_id(&self) -> NodeId {
        self.keys.node_id()
    }

    pub fn keys(&self) -> &NodeKeys {
        &self.keys
    }

    /// Read and decode a JSON value. Missing keys and empty strings both read
    /// as `None`.
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.store.get(key).await? {
            Some(raw) if !raw.trim().is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
            _ => Ok(None),
        }
    }

    async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        debug!("writing {} ({} bytes)", key, raw.len());
        self.store.set(key, raw).await
    }

    pub async fn write_node_state(&self, state: &NodeState) -> StorageResult<()> {
        self.set_json(&self.keys.node_status(), state).await
    }

    pub async fn read_node_state(&self) -> StorageResult<Option<NodeState>> {
        self.get_json(&self.keys.node_status()).await
    }

    /// Assignment list written by the earlier stages
    pub async fn load_assignments(&self) -> StorageResult<Option<Vec<ProcessingRecord>>> {
        self.get_json(&self.keys.assignments()).await
    }

    pub async fn save_assignments(&self, records: &[ProcessingRecord]) -> StorageResult<()> {
        self.set_json(&self.keys.assignments(), records).await
    }

    pub async fn load_pruned(&self) -> StorageResult<Option<Vec<ProcessingRecord>>> {
        self.get_json(&self.keys.pruned()).await
    }

    pub async fn save_pruned(&self, records: &[ProcessingRecord]) -> StorageResult<()> {
        self.set_json(&self.keys.pruned(), records).await
    }

    pub async fn load_export(&self) -> StorageResult<Option<Vec<ProcessingRecord>>> {
        self.get_json(&self.keys.export()).await
    }

    pub async fn save_export(&self, records: &[ProcessingRecord]) -> StorageResult<()> {
        self.set_json(&self.keys.export(), records).await
    }

    /// Drop the intermediate per-node keys, returning how many existed
    pub async fn purge_intermediate(&self) -> StorageResult<usize> {
        self.store.delete(&self.keys.terminate_cleanup()).await
    }
}
