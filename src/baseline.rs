//! Persistent baseline storage
//!
//! The baseline (one highest-observed offset per partition) is the only
//! state the viewer persists across restarts. It is stored per topic so
//! multiple topics do not collide, serialized as a flat JSON object mapping
//! partition number to offset.
//!
//! Storage is strictly best-effort: a failed save or clear is logged and
//! swallowed (the in-memory baseline stays authoritative for the session),
//! and a missing or unparseable record loads as absent rather than as an
//! error. No storage condition is ever surfaced to the reconciliation engine.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Per-partition baseline offsets.
pub type BaselineMap = BTreeMap<i32, i64>;

/// Best-effort key→offset persistence, scoped by topic.
pub trait BaselineStore: Send + Sync {
    /// Load the last-persisted baseline for a topic.
    ///
    /// Returns `None` when no record exists or the stored value fails to
    /// parse; corruption is treated as absence, never as a fatal error.
    fn load(&self, topic: &str) -> Option<BaselineMap>;

    /// Persist the baseline for a topic. Failures are logged and swallowed.
    fn save(&self, topic: &str, baseline: &BaselineMap);

    /// Remove the persisted baseline for a topic. Failures are logged and
    /// swallowed.
    fn clear(&self, topic: &str);
}

/// Baseline storage backed by one JSON file per topic.
pub struct FileBaselineStore {
    base_path: PathBuf,
}

impl FileBaselineStore {
    /// Create a file store rooted at `base_path`, creating the directory if
    /// needed.
    pub fn new<P: AsRef<Path>>(base_path: P) -> crate::error::Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    fn topic_path(&self, topic: &str) -> PathBuf {
        self.base_path.join(topic).join("baseline.json")
    }

    fn try_save(&self, topic: &str, baseline: &BaselineMap) -> crate::error::Result<()> {
        let path = self.topic_path(topic);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(baseline)?;
        fs::write(&path, content)?;
        Ok(())
    }
}

impl BaselineStore for FileBaselineStore {
    fn load(&self, topic: &str) -> Option<BaselineMap> {
        let path = self.topic_path(topic);
        if !path.exists() {
            return None;
        }
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Failed to read baseline, treating as absent");
                return None;
            }
        };
        match serde_json::from_str::<BaselineMap>(&content) {
            Ok(baseline) => {
                debug!(topic = %topic, partitions = baseline.len(), "Loaded baseline");
                Some(baseline)
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "Corrupt baseline record, treating as absent");
                None
            }
        }
    }

    fn save(&self, topic: &str, baseline: &BaselineMap) {
        match self.try_save(topic, baseline) {
            Ok(()) => {
                debug!(topic = %topic, partitions = baseline.len(), "Saved baseline")
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "Failed to persist baseline, continuing in-memory")
            }
        }
    }

    fn clear(&self, topic: &str) {
        let dir = self.base_path.join(topic);
        if !dir.exists() {
            return;
        }
        match fs::remove_dir_all(&dir) {
            Ok(()) => debug!(topic = %topic, "Cleared baseline"),
            Err(e) => warn!(topic = %topic, error = %e, "Failed to clear baseline"),
        }
    }
}

/// In-memory baseline storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryBaselineStore {
    baselines: RwLock<HashMap<String, BaselineMap>>,
}

impl MemoryBaselineStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BaselineStore for MemoryBaselineStore {
    fn load(&self, topic: &str) -> Option<BaselineMap> {
        self.baselines.read().get(topic).cloned()
    }

    fn save(&self, topic: &str, baseline: &BaselineMap) {
        self.baselines
            .write()
            .insert(topic.to_string(), baseline.clone());
    }

    fn clear(&self, topic: &str) {
        self.baselines.write().remove(topic);
    }
}
