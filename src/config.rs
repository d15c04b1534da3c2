//! Viewer configuration
//!
//! Defaults mirror the backend's demo deployment: topic `demo`, a 1.5 s poll
//! cadence, 20-row history pages, and partitions `0, 1, 2` assumed until real
//! data says otherwise. Values are overridable via CLI flags and `TOPICLENS_*`
//! environment variables (see `main.rs`).

use crate::error::{Result, TopiclensError};
use std::path::PathBuf;

/// Default backend base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default topic to view
pub const DEFAULT_TOPIC: &str = "demo";

/// Default poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1500;

/// Default HTTP request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default history page size
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Default partition set assumed before any data is observed
pub const DEFAULT_PARTITIONS: &[i32] = &[0, 1, 2];

/// Default directory for persisted baselines
pub const DEFAULT_STATE_DIR: &str = "./topiclens-state";

/// Default cap on retained history rows
pub const DEFAULT_MAX_HISTORY: usize = 200;

/// Configuration for the viewer.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Base URL of the log backend HTTP API.
    pub base_url: String,
    /// Topic identity; scopes the persisted baseline.
    pub topic: String,
    /// Poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// HTTP request timeout in milliseconds.
    pub timeout_ms: u64,
    /// History rows per page.
    pub page_size: usize,
    /// Partition set assumed before any data is observed.
    pub default_partitions: Vec<i32>,
    /// Directory for persisted baselines.
    pub state_dir: PathBuf,
    /// Cap on retained history rows.
    pub max_history: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            page_size: DEFAULT_PAGE_SIZE,
            default_partitions: DEFAULT_PARTITIONS.to_vec(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl ViewerConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(TopiclensError::config_msg("topic must not be empty"));
        }
        if self.base_url.trim().is_empty() {
            return Err(TopiclensError::config_msg("base URL must not be empty"));
        }
        if self.poll_interval_ms == 0 {
            return Err(TopiclensError::config_msg(
                "poll interval must be at least 1 ms",
            ));
        }
        if self.page_size == 0 {
            return Err(TopiclensError::config_msg("page size must be at least 1"));
        }
        if self.max_history == 0 {
            return Err(TopiclensError::config_msg("max history must be at least 1"));
        }
        Ok(())
    }
}

/// Parse a comma-separated partition list such as `"0,1,2"`.
pub fn parse_partition_list(input: &str) -> Result<Vec<i32>> {
    let mut partitions = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let partition: i32 = part.parse().map_err(|_| {
            TopiclensError::config_msg(format!("invalid partition number: {part:?}"))
        })?;
        if partition < 0 {
            return Err(TopiclensError::config_msg(format!(
                "partition numbers are non-negative, got {partition}"
            )));
        }
        partitions.push(partition);
    }
    partitions.sort_unstable();
    partitions.dedup();
    Ok(partitions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ViewerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.topic, "demo");
        assert_eq!(config.poll_interval_ms, 1500);
        assert_eq!(config.default_partitions, vec![0, 1, 2]);
    }

    #[test]
    fn test_validate_rejects_empty_topic() {
        let config = ViewerConfig {
            topic: "  ".to_string(),
            ..ViewerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = ViewerConfig {
            poll_interval_ms: 0,
            ..ViewerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let config = ViewerConfig {
            page_size: 0,
            ..ViewerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partition_list() {
        assert_eq!(parse_partition_list("0,1,2").unwrap(), vec![0, 1, 2]);
        assert_eq!(parse_partition_list(" 2, 0 ,1 ").unwrap(), vec![0, 1, 2]);
        assert_eq!(parse_partition_list("3,3,3").unwrap(), vec![3]);
        assert_eq!(parse_partition_list("").unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn test_parse_partition_list_rejects_garbage() {
        assert!(parse_partition_list("0,x").is_err());
        assert!(parse_partition_list("-1").is_err());
    }
}
