//! Error types for the preparation service

use std::fmt;
use thiserror::Error;

pub type PreparationResult<T> = Result<T, PreparationError>;

#[derive(Error, Debug)]
pub enum PreparationError {
    /// Transport level failure (connect, TLS, body read)
    #[error("Request failed: {0}")]
    Request(String),

    /// Service answered with a non-success status
    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response did not match the expected contract
    #[error("Invalid response from {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },

    #[error("Client configuration error: {0}")]
    Config(String),
}

impl PreparationError {
    pub fn invalid_response<O: fmt::Display, R: fmt::Display>(operation: O, reason: R) -> Self {
        Self::InvalidResponse {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Transport failures, throttling and server errors are worth another
    /// firing; contract violations are not
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse { .. } | Self::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for PreparationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}
