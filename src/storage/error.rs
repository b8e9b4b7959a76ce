//! Error types for the coordination store

use std::fmt;
use thiserror::Error;

/// Result type for store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Coordination store error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Serialization/deserialization of a stored value failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend command failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// Backend unreachable or pool exhausted
    #[error("Connection error: {0}")]
    Connection(String),

    /// Backend selected but not compiled in or misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout occurred
    #[error("Timeout: operation took longer than {0:?}")]
    Timeout(std::time::Duration),
}

impl StorageError {
    /// Create a serialization error
    pub fn serialization<E: fmt::Display>(err: E) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Create a backend error
    pub fn backend<E: fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    /// Create a connection error
    pub fn connection<E: fmt::Display>(msg: E) -> Self {
        Self::Connection(msg.to_string())
    }

    /// Create a configuration error
    pub fn configuration<E: fmt::Display>(msg: E) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Backend(_) | Self::Connection(_) | Self::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}
