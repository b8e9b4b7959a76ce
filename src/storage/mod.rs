//! Coordination store abstraction
//!
//! Stages of the pipeline hand state to each other through a shared
//! key-value store. Values are JSON strings under keys namespaced by node id.
//! This module provides the store trait, its backends, and a typed per-node
//! view used by the stage coordinator.

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod keys;
pub mod node;
pub mod traits;
pub mod types;

pub use backends::MemoryBackend;
pub use config::{BackendType, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use factory::StorageFactory;
pub use keys::NodeKeys;
pub use node::NodeStore;
pub use traits::CoordinationStore;
pub use types::{ConnectionStatus, HealthStatus};
