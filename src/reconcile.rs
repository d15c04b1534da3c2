//! Snapshot reconciliation engine
//!
//! The engine consumes independently-fetched, possibly-overlapping snapshots
//! of a partitioned log and derives a stable partition set, a dedup-safe
//! identity for every message, a one-time baseline separating pre-existing
//! history from new arrivals, and an incremental count of genuinely new
//! messages.
//!
//! ## Lifecycle
//!
//! The engine starts **Uninitialized**. The first snapshot it observes
//! defines history: every message's identity is recorded, each partition's
//! baseline is set to the highest offset seen (or the `-1` sentinel for a
//! partition with no messages yet), the baseline is persisted, and no
//! new-message events are produced. Every later snapshot is diffed against
//! the identity set and the baseline; only genuinely new arrivals are counted
//! and reported.
//!
//! A viewer attaching mid-stream to a long-lived log must not flood the
//! presentation layer by reporting the entire existing history as new on
//! first load; the baseline snapshot absorbs that cost once.
//!
//! ## Rehydration
//!
//! When the baseline store already holds a record for the topic, the engine
//! is constructed directly in the established state with an empty identity
//! set. Classification then treats any message at `offset <= baseline` for
//! its partition as already seen, so a page reload that replays history does
//! not double-count it.
//!
//! All operations are synchronous and total over well-formed input; snapshots
//! must be delivered serially, in fetch order, by the caller.

use crate::baseline::{BaselineMap, BaselineStore};
use crate::message::{MessageId, MessageRecord, Snapshot};
use crate::topology::TopologyTracker;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of reconciling one snapshot, consumed by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotOutcome {
    /// Messages classified as new by this snapshot, in fetch order.
    /// Always empty for the baseline snapshot.
    pub new_messages: Vec<MessageRecord>,
    /// Running count of messages classified new since the baseline.
    pub new_since_baseline: u64,
    /// Point-in-time per-partition message counts for this snapshot alone.
    pub live_counts: BTreeMap<i32, usize>,
    /// The active partition set after this snapshot.
    pub partitions: BTreeSet<i32>,
    /// True iff this snapshot changed the partition set.
    pub topology_changed: bool,
    /// True iff this snapshot established the baseline.
    pub baseline_snapshot: bool,
    /// Number of malformed records excluded from reconciliation.
    pub malformed: usize,
}

/// The reconciliation state machine.
///
/// Dependencies are constructor-injected so multiple independent instances
/// (one per topic) can coexist and be unit-tested deterministically.
pub struct Reconciler {
    topic: String,
    store: Arc<dyn BaselineStore>,
    topology: TopologyTracker,
    baseline: BaselineMap,
    baseline_established: bool,
    seen: HashSet<MessageId>,
    new_since_baseline: u64,
    live_counts: BTreeMap<i32, usize>,
}

impl Reconciler {
    /// Create an engine for `topic`, rehydrating from the store if a
    /// persisted baseline exists.
    pub fn new(
        topic: impl Into<String>,
        default_partitions: &[i32],
        store: Arc<dyn BaselineStore>,
    ) -> Self {
        let topic = topic.into();
        let topology = TopologyTracker::new(default_partitions);

        let (baseline, baseline_established) = match store.load(&topic) {
            Some(baseline) if !baseline.is_empty() => {
                info!(
                    topic = %topic,
                    partitions = baseline.len(),
                    "Rehydrated baseline from store"
                );
                (baseline, true)
            }
            _ => (BaselineMap::new(), false),
        };

        Self {
            topic,
            store,
            topology,
            baseline,
            baseline_established,
            seen: HashSet::new(),
            new_since_baseline: 0,
            live_counts: BTreeMap::new(),
        }
    }

    /// Reconcile one snapshot.
    ///
    /// Synchronous and infallible: malformed records were already excluded at
    /// decode time and are only reported in the outcome's `malformed` count.
    pub fn observe(&mut self, snapshot: &Snapshot) -> SnapshotOutcome {
        let update = self.topology.observe(snapshot);
        if snapshot.malformed() > 0 {
            debug!(
                topic = %self.topic,
                excluded = snapshot.malformed(),
                "Snapshot contained malformed records"
            );
        }

        let baseline_snapshot = !self.baseline_established;
        let mut new_messages = Vec::new();

        if baseline_snapshot {
            self.establish_baseline(snapshot, &update.partitions);
        } else {
            for message in snapshot.messages() {
                let id = message.id();
                if self.is_known(id) {
                    continue;
                }
                self.seen.insert(id);
                self.new_since_baseline += 1;
                new_messages.push(message.clone());
            }
            if !new_messages.is_empty() {
                debug!(
                    topic = %self.topic,
                    new = new_messages.len(),
                    total = self.new_since_baseline,
                    "Classified new messages"
                );
            }
        }

        self.live_counts = Self::count_live(snapshot, self.topology.current());

        SnapshotOutcome {
            new_messages,
            new_since_baseline: self.new_since_baseline,
            live_counts: self.live_counts.clone(),
            partitions: update.partitions,
            topology_changed: update.changed,
            baseline_snapshot,
            malformed: snapshot.malformed(),
        }
    }

    /// Return to the Uninitialized state and clear the persisted record.
    ///
    /// The only transition available to callers besides feeding snapshots.
    pub fn reset(&mut self) {
        self.seen.clear();
        self.new_since_baseline = 0;
        self.baseline.clear();
        self.baseline_established = false;
        self.live_counts.clear();
        self.topology.reset();
        self.store.clear(&self.topic);
        info!(topic = %self.topic, "Reconciler reset");
    }

    fn establish_baseline(&mut self, snapshot: &Snapshot, partitions: &BTreeSet<i32>) {
        let mut highest: BTreeMap<i32, i64> = BTreeMap::new();
        for message in snapshot.messages() {
            self.seen.insert(message.id());
            let entry = highest.entry(message.partition).or_insert(-1);
            if message.offset > *entry {
                *entry = message.offset;
            }
        }
        // A partition with no messages yet gets the -1 sentinel: nothing
        // seen, everything that arrives later is new.
        for &partition in partitions {
            self.baseline
                .insert(partition, highest.get(&partition).copied().unwrap_or(-1));
        }
        self.store.save(&self.topic, &self.baseline);
        self.baseline_established = true;
        info!(
            topic = %self.topic,
            absorbed = snapshot.len(),
            partitions = self.baseline.len(),
            "Baseline established"
        );
    }

    /// A message is known if its identity was classified before, or if it
    /// sits at or below its partition's baseline (which covers history
    /// replayed after a reload, when the identity set starts empty).
    fn is_known(&self, id: MessageId) -> bool {
        if self.seen.contains(&id) {
            return true;
        }
        id.offset <= self.baseline.get(&id.partition).copied().unwrap_or(-1)
    }

    fn count_live(snapshot: &Snapshot, partitions: &BTreeSet<i32>) -> BTreeMap<i32, usize> {
        let mut counts: BTreeMap<i32, usize> =
            partitions.iter().map(|&p| (p, 0)).collect();
        for message in snapshot.messages() {
            *counts.entry(message.partition).or_insert(0) += 1;
        }
        counts
    }

    /// The topic this engine reconciles.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// True once the baseline has been established (or rehydrated).
    pub fn baseline_established(&self) -> bool {
        self.baseline_established
    }

    /// The per-partition baseline offsets.
    pub fn baseline(&self) -> &BaselineMap {
        &self.baseline
    }

    /// Count of messages classified new since the baseline.
    pub fn new_since_baseline(&self) -> u64 {
        self.new_since_baseline
    }

    /// Number of identities classified so far this session.
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// The active partition set.
    pub fn partitions(&self) -> &BTreeSet<i32> {
        self.topology.current()
    }

    /// Per-partition counts from the most recent snapshot.
    pub fn live_counts(&self) -> &BTreeMap<i32, usize> {
        &self.live_counts
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("topic", &self.topic)
            .field("baseline_established", &self.baseline_established)
            .field("seen", &self.seen.len())
            .field("new_since_baseline", &self.new_since_baseline)
            .finish_non_exhaustive()
    }
}
