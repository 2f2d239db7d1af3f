//! Client error model.
//!
//! Callers see exactly one failure shape: [`ApiError`], a human-readable
//! message. Whether it came from the network, a non-2xx status or an envelope
//! with `success: false` is not part of the contract.

use thiserror::Error;

/// The single failure kind raised by [`crate::ApiClient`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure of the transport itself (the call never produced a response).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("invalid multipart part: {0}")]
    Multipart(String),
}

impl From<TransportError> for ApiError {
    fn from(value: TransportError) -> Self {
        ApiError::new(value.to_string())
    }
}
