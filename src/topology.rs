//! Partition topology tracking
//!
//! Derives the set of partitions known to exist from observed snapshots. The
//! first non-empty observation defines the initial set; before any data
//! arrives a configured default set is reported so the presentation layer has
//! something to render. Once a partition has been observed it stays in the
//! topology for the rest of the session: later snapshots can only add
//! partitions, never retract them.

use crate::message::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Result of feeding one snapshot to the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyUpdate {
    /// The active partition set after this observation.
    pub partitions: BTreeSet<i32>,
    /// True iff the set differs from the prior topology.
    pub changed: bool,
}

/// Tracks the active partition set across snapshots.
#[derive(Debug, Clone)]
pub struct TopologyTracker {
    defaults: Vec<i32>,
    partitions: BTreeSet<i32>,
    initialized: bool,
}

impl TopologyTracker {
    /// Create a tracker that reports `defaults` until real data arrives.
    pub fn new(defaults: &[i32]) -> Self {
        Self {
            defaults: defaults.to_vec(),
            partitions: defaults.iter().copied().collect(),
            initialized: false,
        }
    }

    /// Observe one snapshot and return the resulting partition set.
    ///
    /// An empty snapshot is a no-op, never a topology reset.
    pub fn observe(&mut self, snapshot: &Snapshot) -> TopologyUpdate {
        let observed: BTreeSet<i32> = snapshot
            .messages()
            .iter()
            .map(|m| m.partition)
            .collect();

        if observed.is_empty() {
            return TopologyUpdate {
                partitions: self.partitions.clone(),
                changed: false,
            };
        }

        let changed = if self.initialized {
            let added: Vec<i32> = observed
                .difference(&self.partitions)
                .copied()
                .collect();
            if !added.is_empty() {
                debug!(partitions = ?added, "New partitions observed");
                self.partitions.extend(added.iter().copied());
            }
            !added.is_empty()
        } else {
            // First real data replaces the configured default set.
            let changed = observed != self.partitions;
            self.partitions = observed;
            self.initialized = true;
            changed
        };

        TopologyUpdate {
            partitions: self.partitions.clone(),
            changed,
        }
    }

    /// The current partition set.
    pub fn current(&self) -> &BTreeSet<i32> {
        &self.partitions
    }

    /// Revert to the configured default set.
    pub fn reset(&mut self) {
        self.partitions = self.defaults.iter().copied().collect();
        self.initialized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageRecord, Snapshot};

    fn snapshot_with_partitions(partitions: &[i32]) -> Snapshot {
        let messages = partitions
            .iter()
            .enumerate()
            .map(|(i, &p)| MessageRecord {
                ts: 0,
                partition: p,
                offset: i as i64,
                key: None,
                value: "v".to_string(),
            })
            .collect();
        Snapshot::from_messages(messages)
    }

    #[test]
    fn test_defaults_before_data() {
        let tracker = TopologyTracker::new(&[0, 1, 2]);
        assert_eq!(
            tracker.current().iter().copied().collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_first_observation_replaces_defaults() {
        let mut tracker = TopologyTracker::new(&[0, 1, 2]);
        let update = tracker.observe(&snapshot_with_partitions(&[3, 5]));
        assert!(update.changed);
        assert_eq!(
            update.partitions.iter().copied().collect::<Vec<_>>(),
            vec![3, 5]
        );
    }

    #[test]
    fn test_empty_first_observation_keeps_defaults() {
        let mut tracker = TopologyTracker::new(&[0, 1]);
        let update = tracker.observe(&Snapshot::default());
        assert!(!update.changed);
        assert_eq!(
            update.partitions.iter().copied().collect::<Vec<_>>(),
            vec![0, 1]
        );

        // Defaults were never replaced, so real data still takes over.
        let update = tracker.observe(&snapshot_with_partitions(&[4]));
        assert!(update.changed);
        assert_eq!(
            update.partitions.iter().copied().collect::<Vec<_>>(),
            vec![4]
        );
    }

    #[test]
    fn test_growth_is_append_only() {
        let mut tracker = TopologyTracker::new(&[]);
        tracker.observe(&snapshot_with_partitions(&[0, 1]));

        let update = tracker.observe(&snapshot_with_partitions(&[0, 1, 2]));
        assert!(update.changed);
        assert_eq!(
            update.partitions.iter().copied().collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        // A later snapshot missing partition 2 does not retract it.
        let update = tracker.observe(&snapshot_with_partitions(&[0, 1]));
        assert!(!update.changed);
        assert_eq!(
            update.partitions.iter().copied().collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_empty_snapshot_is_noop_after_init() {
        let mut tracker = TopologyTracker::new(&[0]);
        tracker.observe(&snapshot_with_partitions(&[0, 1]));
        let update = tracker.observe(&Snapshot::default());
        assert!(!update.changed);
        assert_eq!(
            update.partitions.iter().copied().collect::<Vec<_>>(),
            vec![0, 1]
        );
    }

    #[test]
    fn test_reset_reverts_to_defaults() {
        let mut tracker = TopologyTracker::new(&[0, 1, 2]);
        tracker.observe(&snapshot_with_partitions(&[7, 9]));
        tracker.reset();
        assert_eq!(
            tracker.current().iter().copied().collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        // Post-reset the tracker behaves like a fresh one.
        let update = tracker.observe(&snapshot_with_partitions(&[7]));
        assert!(update.changed);
        assert_eq!(
            update.partitions.iter().copied().collect::<Vec<_>>(),
            vec![7]
        );
    }
}
