//! HTTP client for the log backend
//!
//! The backend exposes a small plain-HTTP surface: `GET /messages` returns
//! the current snapshot as a JSON array, `POST /produce` accepts a
//! form-encoded key and value and answers with the assigned partition and
//! offset as text, `POST /reset` clears the backend's retained history, and
//! `GET /healthz` answers `ok`.

use crate::message::{Snapshot, WireRecord};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from backend communication.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Configuration for the log backend client.
#[derive(Debug, Clone)]
pub struct LogClientConfig {
    /// Base URL of the backend HTTP API.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for LogClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 5000,
        }
    }
}

/// Acknowledgement of one submitted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceAck {
    /// Partition the backend assigned.
    pub partition: i32,
    /// Offset the message landed at.
    pub offset: i64,
}

/// HTTP client for the log backend.
pub struct LogClient {
    config: LogClientConfig,
    client: reqwest::Client,
}

impl LogClient {
    /// Create a new client.
    pub fn new(config: LogClientConfig) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| {
                crate::error::TopiclensError::Internal(format!(
                    "Failed to create HTTP client: {}",
                    e
                ))
            })?;
        Ok(Self { config, client })
    }

    /// Fetch the current snapshot of visible messages.
    ///
    /// The response is consumed as the full current snapshot; no pagination
    /// contract is implied.
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, ClientError> {
        let url = format!("{}/messages", self.config.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Api(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let records: Vec<WireRecord> = response.json().await?;
        Ok(Snapshot::from_wire(records))
    }

    /// Submit a message; the backend assigns the partition.
    ///
    /// An empty key submits the value unkeyed.
    pub async fn produce(&self, key: &str, value: &str) -> Result<ProduceAck, ClientError> {
        let url = format!("{}/produce", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[("key", key), ("value", value)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Api(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body = response.text().await?;
        parse_produce_ack(&body)
    }

    /// Clear the backend's retained history.
    ///
    /// Callers must reset the reconciliation engine alongside this.
    pub async fn reset_backend(&self) -> Result<(), ClientError> {
        let url = format!("{}/reset", self.config.base_url);
        let response = self.client.post(&url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Api(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Probe backend health.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let url = format!("{}/healthz", self.config.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

/// Parse the backend's produce acknowledgement text,
/// `"Produced to partition <p> offset <o>"`.
fn parse_produce_ack(body: &str) -> Result<ProduceAck, ClientError> {
    let mut words = body.split_whitespace();
    let mut partition: Option<i32> = None;
    let mut offset: Option<i64> = None;

    while let Some(word) = words.next() {
        match word {
            "partition" => partition = words.next().and_then(|w| w.parse().ok()),
            "offset" => offset = words.next().and_then(|w| w.parse().ok()),
            _ => {}
        }
    }

    match (partition, offset) {
        (Some(partition), Some(offset)) if partition >= 0 && offset >= 0 => {
            Ok(ProduceAck { partition, offset })
        }
        _ => Err(ClientError::Parse(format!(
            "Unrecognized produce acknowledgement: {:?}",
            body
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = LogClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout_ms, 5000);
    }

    #[test]
    fn test_parse_produce_ack() {
        let ack = parse_produce_ack("Produced to partition 2 offset 17").unwrap();
        assert_eq!(
            ack,
            ProduceAck {
                partition: 2,
                offset: 17
            }
        );
    }

    #[test]
    fn test_parse_produce_ack_rejects_garbage() {
        assert!(parse_produce_ack("").is_err());
        assert!(parse_produce_ack("Error: topic unavailable").is_err());
        assert!(parse_produce_ack("Produced to partition x offset 1").is_err());
        assert!(parse_produce_ack("Produced to partition -1 offset 1").is_err());
        assert!(parse_produce_ack("Produced to partition 1").is_err());
    }

    #[test]
    fn test_client_creation() {
        let client = LogClient::new(LogClientConfig::default()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
