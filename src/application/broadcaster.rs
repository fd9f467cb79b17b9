//! Periodic push feed: one scheduler task publishing to many subscribers

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::infrastructure::sources::UpdateSource;
use crate::shared::types::YieldUpdate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Fetching,
    Publishing,
    Stopped,
}

/// One published update set
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub records: Vec<YieldUpdate>,
}

/// Fan-out point between the scheduler and connected clients
pub struct FeedHub {
    sender: broadcast::Sender<Arc<FeedEvent>>,
    last: RwLock<Option<Arc<FeedEvent>>>,
    state: watch::Sender<SchedulerState>,
    replay: bool,
}

impl FeedHub {
    pub fn new(capacity: usize, replay: bool) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            sender,
            last: RwLock::new(None),
            state,
            replay,
        }
    }

    pub async fn subscribe(&self) -> FeedSubscription {
        // receiver first so nothing published after the replay read is lost
        let receiver = self.sender.subscribe();
        let pending = if self.replay {
            self.last.read().await.clone()
        } else {
            None
        };

        FeedSubscription {
            pending,
            stream: BroadcastStream::new(receiver),
            last_seen: 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub async fn last_sequence(&self) -> Option<u64> {
        self.last.read().await.as_ref().map(|e| e.sequence)
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub(crate) fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }

    pub(crate) async fn publish(&self, event: FeedEvent) -> usize {
        let event = Arc::new(event);
        *self.last.write().await = Some(event.clone());
        // no receivers is not an error
        self.sender.send(event).unwrap_or(0)
    }
}

/// Per-client view of the feed. Yields each sequence at most once.
pub struct FeedSubscription {
    pending: Option<Arc<FeedEvent>>,
    stream: BroadcastStream<Arc<FeedEvent>>,
    last_seen: u64,
}

impl FeedSubscription {
    /// Next event, or `None` once the hub is gone
    pub async fn next(&mut self) -> Option<Arc<FeedEvent>> {
        if let Some(event) = self.pending.take() {
            self.last_seen = event.sequence;
            return Some(event);
        }

        while let Some(item) = self.stream.next().await {
            match item {
                Ok(event) if event.sequence <= self.last_seen => continue,
                Ok(event) => {
                    self.last_seen = event.sequence;
                    return Some(event);
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "🐢 Subscriber lagged, dropping old events");
                }
            }
        }
        None
    }
}

pub struct BroadcastScheduler {
    source: Arc<dyn UpdateSource>,
    hub: Arc<FeedHub>,
    period: Duration,
}

/// Running scheduler task
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop and wait for the task to exit
    pub async fn shutdown(self) {
        self.shutdown_tx.send_replace(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Broadcast scheduler task ended abnormally");
        }
    }
}

impl BroadcastScheduler {
    pub fn new(source: Arc<dyn UpdateSource>, hub: Arc<FeedHub>, period: Duration) -> Self {
        Self { source, hub, period }
    }

    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle { shutdown_tx, handle }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        // ticks missed while a fetch is in flight are dropped, not queued
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sequence = 0u64;

        info!(period_secs = self.period.as_secs_f64(), "📡 Broadcast scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            self.hub.set_state(SchedulerState::Fetching);
            let records = tokio::select! {
                records = self.source.fetch_updates() => records,
                _ = shutdown.changed() => break,
            };

            if records.is_empty() {
                debug!("No update records this cycle, skipping publish");
                self.hub.set_state(SchedulerState::Idle);
                continue;
            }

            self.hub.set_state(SchedulerState::Publishing);
            sequence += 1;
            let count = records.len();
            let delivered = self
                .hub
                .publish(FeedEvent {
                    sequence,
                    timestamp: Utc::now(),
                    records,
                })
                .await;
            info!(
                sequence,
                records = count,
                subscribers = delivered,
                "📣 Yield update broadcast"
            );
            self.hub.set_state(SchedulerState::Idle);
        }

        self.hub.set_state(SchedulerState::Stopped);
        info!("🛑 Broadcast scheduler stopped");
    }
}
