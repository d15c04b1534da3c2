//! Message data model and identity
//!
//! The backend returns one snapshot per poll: a JSON array of records shaped
//! as `{"ts": millis, "partition": n, "offset": n, "key": ..., "value": ...}`.
//! Records are decoded leniently ([`WireRecord`]) and validated into
//! [`MessageRecord`]s; a record with a missing or negative partition or offset
//! is malformed and excluded from reconciliation entirely.
//!
//! A message is uniquely identified by its `(partition, offset)` pair
//! ([`MessageId`]); key, value, and timestamp never participate in identity,
//! since duplicate fetches of the same log position may legitimately disagree
//! on those fields.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One record as fetched from the backend, before validation.
///
/// Every field is optional so a partially populated record deserializes
/// rather than failing the whole snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireRecord {
    /// Broker-assigned timestamp in epoch milliseconds.
    #[serde(default)]
    pub ts: Option<i64>,
    /// Partition the record was written to.
    #[serde(default)]
    pub partition: Option<i64>,
    /// Offset within the partition.
    #[serde(default)]
    pub offset: Option<i64>,
    /// Optional record key.
    #[serde(default)]
    pub key: Option<String>,
    /// Record payload.
    #[serde(default)]
    pub value: Option<String>,
}

impl WireRecord {
    /// Validate into a [`MessageRecord`].
    ///
    /// Returns `None` when the record is malformed: partition or offset
    /// missing, negative, or (for partition) out of `i32` range. A missing
    /// value is tolerated and becomes the empty string; a missing timestamp
    /// becomes 0.
    pub fn validate(&self) -> Option<MessageRecord> {
        let partition = match self.partition {
            Some(p) if (0..=i64::from(i32::MAX)).contains(&p) => p as i32,
            _ => return None,
        };
        let offset = match self.offset {
            Some(o) if o >= 0 => o,
            _ => return None,
        };
        Some(MessageRecord {
            ts: self.ts.unwrap_or(0),
            partition,
            offset,
            key: self.key.clone(),
            value: self.value.clone().unwrap_or_default(),
        })
    }
}

/// A validated message from the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Timestamp in epoch milliseconds.
    pub ts: i64,
    /// Partition number, non-negative.
    pub partition: i32,
    /// Offset within the partition, non-negative.
    pub offset: i64,
    /// Optional record key.
    pub key: Option<String>,
    /// Record payload.
    pub value: String,
}

impl MessageRecord {
    /// The dedup identity of this message.
    pub fn id(&self) -> MessageId {
        MessageId {
            partition: self.partition,
            offset: self.offset,
        }
    }

    /// Timestamp as a UTC datetime, for display.
    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.ts)
            .single()
            .unwrap_or_else(|| Utc.timestamp_millis_opt(0).single().unwrap_or_default())
    }
}

/// Unique, order-stable identity of a message: its `(partition, offset)` pair.
///
/// Total and deterministic; two messages at the same log position compare
/// equal regardless of key, value, or timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId {
    /// Partition number.
    pub partition: i32,
    /// Offset within the partition.
    pub offset: i64,
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.partition, self.offset)
    }
}

/// One full point-in-time read of the currently visible messages.
///
/// Validation happens at construction; the snapshot holds the valid records
/// plus a count of records it had to exclude. No sorting or gap-freeness is
/// assumed: the backend only guarantees append-only growth.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    messages: Vec<MessageRecord>,
    malformed: usize,
}

impl Snapshot {
    /// Build a snapshot from raw wire records, excluding malformed ones.
    pub fn from_wire(records: Vec<WireRecord>) -> Self {
        let mut messages = Vec::with_capacity(records.len());
        let mut malformed = 0;
        for record in &records {
            match record.validate() {
                Some(msg) => messages.push(msg),
                None => malformed += 1,
            }
        }
        Self { messages, malformed }
    }

    /// Build a snapshot directly from validated records (tests, replay).
    pub fn from_messages(messages: Vec<MessageRecord>) -> Self {
        Self {
            messages,
            malformed: 0,
        }
    }

    /// The valid messages in fetch order.
    pub fn messages(&self) -> &[MessageRecord] {
        &self.messages
    }

    /// Number of records excluded as malformed.
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Number of valid messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when the snapshot carries no valid messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(partition: Option<i64>, offset: Option<i64>) -> WireRecord {
        WireRecord {
            ts: Some(1_700_000_000_000),
            partition,
            offset,
            key: Some("k1".to_string()),
            value: Some("v".to_string()),
        }
    }

    #[test]
    fn test_identity_ignores_payload() {
        let a = MessageRecord {
            ts: 1,
            partition: 2,
            offset: 7,
            key: Some("k1".to_string()),
            value: "first fetch".to_string(),
        };
        let b = MessageRecord {
            ts: 99,
            partition: 2,
            offset: 7,
            key: None,
            value: "second fetch".to_string(),
        };
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_identity_distinguishes_positions() {
        let base = wire(Some(0), Some(5)).validate().unwrap();
        let other_offset = wire(Some(0), Some(6)).validate().unwrap();
        let other_partition = wire(Some(1), Some(5)).validate().unwrap();
        assert_ne!(base.id(), other_offset.id());
        assert_ne!(base.id(), other_partition.id());
    }

    #[test]
    fn test_identity_display() {
        let id = MessageId {
            partition: 1,
            offset: 42,
        };
        assert_eq!(id.to_string(), "1:42");
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        assert!(wire(None, Some(3)).validate().is_none());
        assert!(wire(Some(0), None).validate().is_none());
    }

    #[test]
    fn test_validate_rejects_negative_fields() {
        assert!(wire(Some(-1), Some(3)).validate().is_none());
        assert!(wire(Some(0), Some(-3)).validate().is_none());
    }

    #[test]
    fn test_validate_rejects_partition_overflow() {
        assert!(wire(Some(i64::from(i32::MAX) + 1), Some(0)).validate().is_none());
    }

    #[test]
    fn test_validate_tolerates_missing_value() {
        let record = WireRecord {
            ts: None,
            partition: Some(0),
            offset: Some(0),
            key: None,
            value: None,
        };
        let msg = record.validate().unwrap();
        assert_eq!(msg.value, "");
        assert_eq!(msg.ts, 0);
        assert!(msg.key.is_none());
    }

    #[test]
    fn test_snapshot_excludes_malformed() {
        let snapshot = Snapshot::from_wire(vec![
            wire(Some(0), Some(0)),
            wire(None, Some(1)),
            wire(Some(0), Some(2)),
        ]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.malformed(), 1);
    }

    #[test]
    fn test_wire_decode_backend_shape() {
        let json = r#"{"ts":1700000000000,"partition":1,"offset":12,"key":"k3","value":"hello"}"#;
        let record: WireRecord = serde_json::from_str(json).unwrap();
        let msg = record.validate().unwrap();
        assert_eq!(msg.partition, 1);
        assert_eq!(msg.offset, 12);
        assert_eq!(msg.key.as_deref(), Some("k3"));
        assert_eq!(msg.value, "hello");
    }

    #[test]
    fn test_wire_decode_null_key() {
        let json = r#"{"ts":1,"partition":0,"offset":0,"key":null,"value":"v"}"#;
        let record: WireRecord = serde_json::from_str(json).unwrap();
        assert!(record.validate().unwrap().key.is_none());
    }
}
