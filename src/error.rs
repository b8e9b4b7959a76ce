use thiserror::Error;

use crate::preparation::PreparationError;
use crate::storage::StorageError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Preparation service error: {0}")]
    Preparation(#[from] PreparationError),
}

impl Error {
    /// Create a configuration error
    pub fn config<E: std::fmt::Display>(msg: E) -> Self {
        Self::Config(msg.to_string())
    }

    /// Whether the next scheduled firing may reasonably succeed without
    /// operator intervention
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_retryable(),
            Self::Preparation(e) => e.is_retryable(),
            Self::Io(_) => true,
            _ => false,
        }
    }
}
