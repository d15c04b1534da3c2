//! Polling driver
//!
//! Repeatedly acquires snapshots from a [`SnapshotSource`] and feeds them to
//! the reconciliation engine, one fully processed before the next, in fetch
//! order. The driver owns all waiting; the engine itself never suspends.
//!
//! A fetch failure skips that cycle (no engine state changes) and is
//! surfaced to the presentation layer as a [`ViewerEvent::FetchFailed`].
//! The cadence can be adjusted at any time without touching engine state,
//! and a poke triggers one accelerated poll (used right after a submission
//! so the new message shows up without waiting a full period).

use crate::client::ClientError;
use crate::message::Snapshot;
use crate::reconcile::{Reconciler, SnapshotOutcome};
use crate::view::ViewState;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Capacity of the viewer event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Source of snapshots for the driver.
///
/// Implemented by [`crate::client::LogClient`] over HTTP, and by scripted
/// fakes in tests.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch one fresh snapshot.
    async fn fetch(&self) -> Result<Snapshot, ClientError>;
}

#[async_trait]
impl SnapshotSource for crate::client::LogClient {
    async fn fetch(&self) -> Result<Snapshot, ClientError> {
        self.fetch_snapshot().await
    }
}

#[async_trait]
impl<S: SnapshotSource + ?Sized> SnapshotSource for Arc<S> {
    async fn fetch(&self) -> Result<Snapshot, ClientError> {
        (**self).fetch().await
    }
}

/// Events broadcast to the presentation layer.
#[derive(Debug, Clone)]
pub enum ViewerEvent {
    /// A snapshot was fetched and reconciled.
    SnapshotApplied(SnapshotOutcome),
    /// A fetch failed; the cycle was skipped with no state change.
    FetchFailed {
        /// Human-readable failure description.
        error: String,
    },
    /// Engine and view state were reset.
    ResetApplied,
    /// The driver stopped.
    Stopped,
}

enum PollCommand {
    SetInterval(Duration),
    Poke,
    Reset,
    Stop,
}

/// Handle to a running poll driver.
#[derive(Clone)]
pub struct PollerHandle {
    cmd_tx: mpsc::UnboundedSender<PollCommand>,
    event_tx: broadcast::Sender<ViewerEvent>,
}

impl PollerHandle {
    /// Subscribe to viewer events.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.event_tx.subscribe()
    }

    /// Change the polling cadence. Never resets engine state.
    pub fn set_interval(&self, interval: Duration) {
        let _ = self.cmd_tx.send(PollCommand::SetInterval(interval));
    }

    /// Trigger one accelerated poll immediately.
    pub fn poke(&self) {
        let _ = self.cmd_tx.send(PollCommand::Poke);
    }

    /// Reset the engine and view; the caller is responsible for resetting
    /// backend-visible state alongside this.
    pub fn reset(&self) {
        let _ = self.cmd_tx.send(PollCommand::Reset);
    }

    /// Stop the driver.
    pub fn stop(&self) {
        let _ = self.cmd_tx.send(PollCommand::Stop);
    }
}

/// Spawns and drives the polling loop.
pub struct PollDriver;

impl PollDriver {
    /// Spawn the polling task.
    ///
    /// The first poll happens immediately; subsequent polls follow the
    /// configured interval until the handle stops the driver or is dropped.
    pub fn spawn<S>(
        source: S,
        reconciler: Reconciler,
        view: Arc<RwLock<ViewState>>,
        interval: Duration,
    ) -> PollerHandle
    where
        S: SnapshotSource + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let handle = PollerHandle {
            cmd_tx,
            event_tx: event_tx.clone(),
        };

        tokio::spawn(poll_loop(
            source, reconciler, view, interval, cmd_rx, event_tx,
        ));
        handle
    }
}

async fn poll_loop<S>(
    source: S,
    mut reconciler: Reconciler,
    view: Arc<RwLock<ViewState>>,
    interval: Duration,
    mut cmd_rx: mpsc::UnboundedReceiver<PollCommand>,
    event_tx: broadcast::Sender<ViewerEvent>,
) where
    S: SnapshotSource,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(interval_ms = interval.as_millis() as u64, "Poll driver started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                poll_once(&source, &mut reconciler, &view, &event_tx).await;
            }
            cmd = cmd_rx.recv() => match cmd {
                Some(PollCommand::SetInterval(new_interval)) => {
                    debug!(interval_ms = new_interval.as_millis() as u64, "Poll cadence changed");
                    ticker = tokio::time::interval_at(
                        Instant::now() + new_interval,
                        new_interval,
                    );
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                }
                Some(PollCommand::Poke) => {
                    poll_once(&source, &mut reconciler, &view, &event_tx).await;
                }
                Some(PollCommand::Reset) => {
                    reconciler.reset();
                    view.write().reset();
                    let _ = event_tx.send(ViewerEvent::ResetApplied);
                }
                Some(PollCommand::Stop) | None => {
                    info!("Poll driver stopping");
                    let _ = event_tx.send(ViewerEvent::Stopped);
                    break;
                }
            }
        }
    }
}

async fn poll_once<S>(
    source: &S,
    reconciler: &mut Reconciler,
    view: &Arc<RwLock<ViewState>>,
    event_tx: &broadcast::Sender<ViewerEvent>,
) where
    S: SnapshotSource,
{
    match source.fetch().await {
        Ok(snapshot) => {
            let outcome = reconciler.observe(&snapshot);
            view.write().apply(snapshot.messages(), &outcome);
            let _ = event_tx.send(ViewerEvent::SnapshotApplied(outcome));
        }
        Err(e) => {
            warn!(error = %e, "Snapshot fetch failed, skipping cycle");
            let error = e.to_string();
            view.write().set_error(&error);
            let _ = event_tx.send(ViewerEvent::FetchFailed { error });
        }
    }
}
