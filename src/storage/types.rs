//! Type definitions for the coordination store

use serde::{Deserialize, Serialize};

/// Backend health snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub backend_type: String,
    pub connection_status: ConnectionStatus,
    pub latency_ms: u64,
    pub errors: Vec<String>,
}

/// Connection status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Degraded,
}
