//! topiclens - live viewer for a partitioned message log
//!
//! Connects to a log backend over HTTP, polls the topic's current snapshot
//! on a fixed cadence, and reports what changed: per-partition counts, new
//! arrivals since the baseline, and fetch failures.
//!
//! ## Usage
//!
//! ```bash
//! # Watch the demo topic on a local backend
//! topiclens
//!
//! # Watch another backend and topic, polling twice a second
//! topiclens --base-url http://log.example.com:8080 --topic orders --poll-interval-ms 500
//!
//! # Clear backend history and local baseline, then send 20 demo messages
//! topiclens --reset --produce-demo 20
//! ```

use clap::Parser;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use topiclens::config::{
    parse_partition_list, DEFAULT_BASE_URL, DEFAULT_MAX_HISTORY, DEFAULT_PAGE_SIZE,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_STATE_DIR, DEFAULT_TIMEOUT_MS, DEFAULT_TOPIC,
};
use topiclens::{
    FileBaselineStore, LogClient, LogClientConfig, PollDriver, Reconciler, Result,
    TopiclensError, ViewState, ViewerConfig, ViewerEvent,
};
use tracing::{info, warn};

/// Keys used by the demo producer, matching the backend's demo UI.
const DEMO_KEY_POOL: [&str; 8] = ["k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7"];

/// topiclens - live viewer for a partitioned message log
#[derive(Parser, Debug)]
#[command(name = "topiclens")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the log backend HTTP API
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "TOPICLENS_URL")]
    base_url: String,

    /// Topic to view; scopes the persisted baseline
    #[arg(long, default_value = DEFAULT_TOPIC, env = "TOPICLENS_TOPIC")]
    topic: String,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS, env = "TOPICLENS_POLL_MS")]
    poll_interval_ms: u64,

    /// HTTP request timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, env = "TOPICLENS_TIMEOUT_MS")]
    timeout_ms: u64,

    /// History rows per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, env = "TOPICLENS_PAGE_SIZE")]
    page_size: usize,

    /// Comma-separated partition set assumed before any data arrives
    #[arg(long, default_value = "0,1,2", env = "TOPICLENS_PARTITIONS")]
    partitions: String,

    /// Directory for persisted baselines
    #[arg(long, default_value = DEFAULT_STATE_DIR, env = "TOPICLENS_STATE_DIR")]
    state_dir: PathBuf,

    /// Maximum history rows retained for display
    #[arg(long, default_value_t = DEFAULT_MAX_HISTORY, env = "TOPICLENS_MAX_HISTORY")]
    max_history: usize,

    /// Clear backend history and the local baseline before watching
    #[arg(long)]
    reset: bool,

    /// Send this many demo messages after startup
    #[arg(long, default_value_t = 0)]
    produce_demo: usize,
}

impl Args {
    fn into_config(self) -> Result<(ViewerConfig, bool, usize)> {
        let default_partitions = parse_partition_list(&self.partitions)?;
        let config = ViewerConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            topic: self.topic,
            poll_interval_ms: self.poll_interval_ms,
            timeout_ms: self.timeout_ms,
            page_size: self.page_size,
            default_partitions,
            state_dir: self.state_dir,
            max_history: self.max_history,
        };
        config.validate()?;
        Ok((config, self.reset, self.produce_demo))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let (config, reset, produce_demo) = args.into_config()?;

    info!("Starting topiclens v{}", env!("CARGO_PKG_VERSION"));
    info!(
        backend = %config.base_url,
        topic = %config.topic,
        interval_ms = config.poll_interval_ms,
        "Watching topic"
    );

    let client = Arc::new(LogClient::new(LogClientConfig {
        base_url: config.base_url.clone(),
        timeout_ms: config.timeout_ms,
    })?);

    if !client.health().await? {
        return Err(TopiclensError::Internal(format!(
            "Backend at {} is not healthy",
            config.base_url
        )));
    }

    let store = Arc::new(FileBaselineStore::new(&config.state_dir)?);
    let mut reconciler = Reconciler::new(&config.topic, &config.default_partitions, store);

    if reset {
        client.reset_backend().await?;
        reconciler.reset();
        info!("Backend history and local baseline cleared");
    }

    let view = Arc::new(RwLock::new(ViewState::new(
        config.page_size,
        config.max_history,
    )));

    let handle = PollDriver::spawn(
        client.clone(),
        reconciler,
        view.clone(),
        Duration::from_millis(config.poll_interval_ms),
    );
    let mut events = handle.subscribe();

    if produce_demo > 0 {
        produce_demo_messages(&client, &view, produce_demo).await;
        handle.poke();
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if !render_event(&view, event) {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Viewer lagged behind events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                handle.stop();
            }
        }
    }

    Ok(())
}

/// Send a burst of keyed demo messages, recording backend partition
/// assignments in the view.
async fn produce_demo_messages(client: &LogClient, view: &Arc<RwLock<ViewState>>, count: usize) {
    info!(count, "Sending demo messages");
    for i in 0..count {
        let key = DEMO_KEY_POOL[i % DEMO_KEY_POOL.len()];
        let value = format!("auto-{}-{}", chrono::Utc::now().timestamp_millis(), i);
        match client.produce(key, &value).await {
            Ok(ack) => {
                view.write().record_produced(key, ack.partition);
            }
            Err(e) => {
                warn!(key, error = %e, "Demo produce failed");
            }
        }
    }
    let produced = view.read().produced_total();
    info!(produced, "Demo burst complete");
}

/// Render one viewer event as log output. Returns false when the driver
/// stopped.
fn render_event(view: &Arc<RwLock<ViewState>>, event: ViewerEvent) -> bool {
    match event {
        ViewerEvent::SnapshotApplied(outcome) => {
            if outcome.baseline_snapshot {
                info!(
                    absorbed = outcome.live_counts.values().sum::<usize>(),
                    partitions = ?outcome.partitions,
                    "Baseline established; existing history will not be reported as new"
                );
            }
            for message in &outcome.new_messages {
                info!(
                    id = %message.id(),
                    key = message.key.as_deref().unwrap_or(""),
                    at = %message.timestamp().format("%H:%M:%S%.3f"),
                    "{}",
                    message.value
                );
            }
            if outcome.topology_changed {
                info!(partitions = ?outcome.partitions, "Partition set changed");
            }
            let counts: Vec<String> = outcome
                .live_counts
                .iter()
                .map(|(p, n)| format!("p{p}={n}"))
                .collect();
            let page = view.read().history_page();
            info!(
                new_since_baseline = outcome.new_since_baseline,
                live = %counts.join(" "),
                rows = page.total,
                pages = page.pages,
                "Snapshot applied"
            );
            true
        }
        ViewerEvent::FetchFailed { error } => {
            warn!(%error, "Cannot reach backend; will retry on schedule");
            true
        }
        ViewerEvent::ResetApplied => {
            info!("Viewer state reset");
            true
        }
        ViewerEvent::Stopped => false,
    }
}
