//! Presentation-facing view state
//!
//! Holds what a rendering layer needs: the latest snapshot's history with
//! pagination, running totals, the key→partition attribution learned from
//! produce acknowledgements, and the last transport error. The view consumes
//! engine output and never feeds back into engine state.

use crate::message::MessageRecord;
use crate::reconcile::SnapshotOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One page of reconciled history for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    /// Rows on this page, newest first (backend order).
    pub rows: Vec<MessageRecord>,
    /// Current page, 1-based.
    pub page: usize,
    /// Total number of pages, at least 1.
    pub pages: usize,
    /// Total rows across all pages.
    pub total: usize,
}

/// Mutable state consumed by the presentation layer.
#[derive(Debug)]
pub struct ViewState {
    latest: Vec<MessageRecord>,
    page: usize,
    page_size: usize,
    max_history: usize,
    produced_total: u64,
    consumed_total: u64,
    key_partitions: BTreeMap<String, i32>,
    last_error: Option<String>,
}

impl ViewState {
    /// Create a view with the given page size and history cap.
    pub fn new(page_size: usize, max_history: usize) -> Self {
        Self {
            latest: Vec::new(),
            page: 1,
            page_size: page_size.max(1),
            max_history: max_history.max(1),
            produced_total: 0,
            consumed_total: 0,
            key_partitions: BTreeMap::new(),
            last_error: None,
        }
    }

    /// Apply a reconciled snapshot: replace the history and refresh totals.
    pub fn apply(&mut self, messages: &[MessageRecord], outcome: &SnapshotOutcome) {
        self.latest = messages.iter().take(self.max_history).cloned().collect();
        self.consumed_total = outcome.new_since_baseline;
        self.last_error = None;
        self.clamp_page();
    }

    /// Record a transport failure for display.
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    /// The last transport failure, if the most recent poll failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Record a successful submission and its backend-assigned partition.
    pub fn record_produced(&mut self, key: &str, partition: i32) {
        self.produced_total += 1;
        if !key.is_empty() {
            self.key_partitions.insert(key.to_string(), partition);
        }
    }

    /// Keys attributed to `partition` by produce acknowledgements.
    pub fn keys_for_partition(&self, partition: i32) -> Vec<&str> {
        self.key_partitions
            .iter()
            .filter(|(_, &p)| p == partition)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Total messages submitted through this viewer.
    pub fn produced_total(&self) -> u64 {
        self.produced_total
    }

    /// Total messages classified new since the baseline.
    pub fn consumed_total(&self) -> u64 {
        self.consumed_total
    }

    /// The current page of history.
    pub fn history_page(&self) -> HistoryPage {
        let total = self.latest.len();
        let pages = total.div_ceil(self.page_size).max(1);
        let page = self.page.min(pages);
        let start = (page - 1) * self.page_size;
        let rows = self
            .latest
            .iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();
        HistoryPage {
            rows,
            page,
            pages,
            total,
        }
    }

    /// Move to the next page, clamped to the last.
    pub fn next_page(&mut self) {
        self.page += 1;
        self.clamp_page();
    }

    /// Move to the previous page, clamped to the first.
    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    /// Change the page size and return to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    /// Clear everything except configuration; used alongside engine reset.
    pub fn reset(&mut self) {
        self.latest.clear();
        self.page = 1;
        self.produced_total = 0;
        self.consumed_total = 0;
        self.key_partitions.clear();
        self.last_error = None;
    }

    fn clamp_page(&mut self) {
        let pages = self.latest.len().div_ceil(self.page_size).max(1);
        if self.page > pages {
            self.page = pages;
        }
        if self.page == 0 {
            self.page = 1;
        }
    }
}

/// Map a message key to a display slot in a palette of `palette_len` entries.
///
/// Pure function from identity to display attribute; the same key always
/// lands on the same slot. Uses the `h * 31 + c` string hash the UI has
/// always used, so slot assignments survive a rewrite of the rendering layer.
pub fn key_color_slot(key: &str, palette_len: usize) -> usize {
    if key.is_empty() || palette_len == 0 {
        return 0;
    }
    let mut h: i32 = 0;
    for c in key.chars() {
        h = h.wrapping_mul(31).wrapping_add(c as i32);
    }
    h.unsigned_abs() as usize % palette_len
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn msg(partition: i32, offset: i64) -> MessageRecord {
        MessageRecord {
            ts: offset,
            partition,
            offset,
            key: Some(format!("k{offset}")),
            value: "v".to_string(),
        }
    }

    fn outcome(new_since_baseline: u64) -> SnapshotOutcome {
        SnapshotOutcome {
            new_messages: Vec::new(),
            new_since_baseline,
            live_counts: BTreeMap::new(),
            partitions: BTreeSet::new(),
            topology_changed: false,
            baseline_snapshot: false,
            malformed: 0,
        }
    }

    #[test]
    fn test_pagination_math() {
        let mut view = ViewState::new(20, 200);
        let messages: Vec<_> = (0..45).map(|o| msg(0, o)).collect();
        view.apply(&messages, &outcome(0));

        let page = view.history_page();
        assert_eq!(page.page, 1);
        assert_eq!(page.pages, 3);
        assert_eq!(page.total, 45);
        assert_eq!(page.rows.len(), 20);

        view.next_page();
        view.next_page();
        let page = view.history_page();
        assert_eq!(page.page, 3);
        assert_eq!(page.rows.len(), 5);

        // Clamped at the last page.
        view.next_page();
        assert_eq!(view.history_page().page, 3);

        view.prev_page();
        view.prev_page();
        view.prev_page();
        assert_eq!(view.history_page().page, 1);
    }

    #[test]
    fn test_empty_history_has_one_page() {
        let view = ViewState::new(20, 200);
        let page = view.history_page();
        assert_eq!(page.page, 1);
        assert_eq!(page.pages, 1);
        assert_eq!(page.total, 0);
        assert!(page.rows.is_empty());
    }

    #[test]
    fn test_page_clamps_when_history_shrinks() {
        let mut view = ViewState::new(10, 200);
        let many: Vec<_> = (0..50).map(|o| msg(0, o)).collect();
        view.apply(&many, &outcome(0));
        view.next_page();
        view.next_page();
        assert_eq!(view.history_page().page, 3);

        let few: Vec<_> = (0..5).map(|o| msg(0, o)).collect();
        view.apply(&few, &outcome(0));
        assert_eq!(view.history_page().page, 1);
    }

    #[test]
    fn test_set_page_size_returns_to_first_page() {
        let mut view = ViewState::new(10, 200);
        let messages: Vec<_> = (0..30).map(|o| msg(0, o)).collect();
        view.apply(&messages, &outcome(0));
        view.next_page();

        view.set_page_size(5);
        let page = view.history_page();
        assert_eq!(page.page, 1);
        assert_eq!(page.pages, 6);
    }

    #[test]
    fn test_history_capped() {
        let mut view = ViewState::new(20, 10);
        let messages: Vec<_> = (0..50).map(|o| msg(0, o)).collect();
        view.apply(&messages, &outcome(0));
        assert_eq!(view.history_page().total, 10);
    }

    #[test]
    fn test_apply_clears_error() {
        let mut view = ViewState::new(20, 200);
        view.set_error("connection refused");
        assert!(view.last_error().is_some());

        view.apply(&[], &outcome(0));
        assert!(view.last_error().is_none());
    }

    #[test]
    fn test_key_attribution() {
        let mut view = ViewState::new(20, 200);
        view.record_produced("k0", 2);
        view.record_produced("k1", 0);
        view.record_produced("k2", 2);
        view.record_produced("", 1);

        assert_eq!(view.produced_total(), 4);
        assert_eq!(view.keys_for_partition(2), vec!["k0", "k2"]);
        assert!(view.keys_for_partition(1).is_empty());

        // Re-produced keys follow their latest assignment.
        view.record_produced("k0", 0);
        assert_eq!(view.keys_for_partition(2), vec!["k2"]);
    }

    #[test]
    fn test_reset_clears_view() {
        let mut view = ViewState::new(20, 200);
        let messages: Vec<_> = (0..5).map(|o| msg(0, o)).collect();
        view.apply(&messages, &outcome(3));
        view.record_produced("k0", 0);
        view.set_error("late failure");

        view.reset();
        assert_eq!(view.history_page().total, 0);
        assert_eq!(view.produced_total(), 0);
        assert_eq!(view.consumed_total(), 0);
        assert!(view.keys_for_partition(0).is_empty());
        assert!(view.last_error().is_none());
    }

    #[test]
    fn test_key_color_slot_is_stable() {
        let a = key_color_slot("k3", 8);
        assert_eq!(key_color_slot("k3", 8), a);
        assert!(a < 8);
        assert_eq!(key_color_slot("", 8), 0);
        assert_eq!(key_color_slot("k3", 0), 0);
    }

    #[test]
    fn test_key_color_slot_matches_java_hash() {
        // "k0" hashes to 'k' * 31 + '0' = 107 * 31 + 48 = 3365; 3365 % 8 = 5.
        assert_eq!(key_color_slot("k0", 8), 5);
    }
}
