//! Error types for topiclens
//!
//! This module defines the main error type used throughout the viewer and the
//! `Result` alias built on it. Baseline-store failures are intentionally NOT
//! represented here: the store degrades to in-memory state and logs instead of
//! surfacing errors (see [`crate::baseline`]).

use thiserror::Error;

/// Result type alias for topiclens operations
pub type Result<T> = std::result::Result<T, TopiclensError>;

/// Main error type for the viewer
#[derive(Debug, Error)]
pub enum TopiclensError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Client error: {0}")]
    Client(#[from] crate::client::ClientError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TopiclensError {
    /// Create a configuration error from any displayable value
    pub fn config_msg(msg: impl Into<String>) -> Self {
        TopiclensError::Config(msg.into())
    }
}
