#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # topiclens
//!
//! A live viewer for a partitioned, offset-ordered message log. The viewer
//! periodically polls the backend for a full snapshot of the topic's visible
//! messages and reconciles it against what it has already accounted for:
//! per-partition live counts, a paginated history table, and a running
//! "new since baseline" counter that never re-counts a message.
//!
//! ## Architecture
//!
//! - [`message`]: wire decoding, validation, and `(partition, offset)`
//!   message identity
//! - [`topology`]: the append-only partition set derived from snapshots
//! - [`baseline`]: best-effort persistence of per-partition baseline offsets
//! - [`reconcile`]: the reconciliation engine: baseline establishment,
//!   dedup, new-arrival classification
//! - [`poller`]: the polling driver feeding snapshots to the engine
//! - [`client`]: HTTP client for the log backend
//! - [`view`]: pagination and display-facing state
//! - [`config`]: viewer configuration
//! - [`error`]: error types and `Result` alias
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use topiclens::{FileBaselineStore, Reconciler, Snapshot};
//!
//! # fn main() -> topiclens::Result<()> {
//! let store = Arc::new(FileBaselineStore::new("./state")?);
//! let mut engine = Reconciler::new("demo", &[0, 1, 2], store);
//!
//! // First snapshot defines history; later ones report only new arrivals.
//! let outcome = engine.observe(&Snapshot::default());
//! assert_eq!(outcome.new_since_baseline, 0);
//! # Ok(())
//! # }
//! ```

pub mod baseline;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod poller;
pub mod reconcile;
pub mod topology;
pub mod view;

pub use baseline::{BaselineMap, BaselineStore, FileBaselineStore, MemoryBaselineStore};
pub use client::{ClientError, LogClient, LogClientConfig, ProduceAck};
pub use config::ViewerConfig;
pub use error::{Result, TopiclensError};
pub use message::{MessageId, MessageRecord, Snapshot, WireRecord};
pub use poller::{PollDriver, PollerHandle, SnapshotSource, ViewerEvent};
pub use reconcile::{Reconciler, SnapshotOutcome};
pub use topology::{TopologyTracker, TopologyUpdate};
pub use view::{key_color_slot, HistoryPage, ViewState};
