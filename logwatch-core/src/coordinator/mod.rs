//! Glue between one follower and everything that reads its output.
//!
//! The coordinator task is the only writer of the recent-event ring and the stats
//! aggregator. Readers go through [`ObserverHandle`] and always get copies.

use crate::conf::LogwatchConfig;
use crate::event::LogEvent;
use crate::fanout::{Hub, Subscription, WireMessage};
use crate::follower::{FollowerOutput, FollowerSink, SourceFollower, stopped};
use crate::ring::EventRing;
use crate::stats::{StatsAggregator, StatsSnapshot};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

#[cfg(test)]
mod tests;

/// Parameters of a recent-history query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecentQuery {
    /// At most this many events, newest kept. Defaults to and is capped by the retention limit.
    pub limit: Option<usize>,

    /// Only events with `ts >= since` (epoch ms).
    pub since: Option<i64>,
}

struct Store {
    ring: EventRing<LogEvent>,
    stats: StatsAggregator,
}

struct Shared {
    store: Mutex<Store>,
    hub: Hub,
    recent_limit: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn recent(&self, query: RecentQuery) -> Vec<LogEvent> {
        let limit = query
            .limit
            .unwrap_or(self.recent_limit)
            .min(self.recent_limit);

        let store = self.lock();
        let mut picked: Vec<LogEvent> = store
            .ring
            .iter()
            .rev()
            .filter(|e| query.since.is_none_or(|since| e.ts >= since))
            .take(limit)
            .cloned()
            .collect();
        picked.reverse();
        picked
    }

    fn stats_at(&self, now_ms: i64) -> StatsSnapshot {
        self.lock().stats.snapshot(now_ms)
    }
}

pub struct IngestionCoordinator {
    shared: Arc<Shared>,
    push_interval: Duration,
}

impl IngestionCoordinator {
    pub fn new(cfg: &LogwatchConfig) -> Self {
        let store = Store {
            ring: EventRing::new(cfg.retention.recent_limit),
            stats: StatsAggregator::new(cfg.stats.window_minutes),
        };
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(store),
                hub: Hub::default(),
                recent_limit: cfg.retention.recent_limit,
            }),
            push_interval: Duration::from_millis(cfg.stats.push_interval_ms),
        }
    }

    /// Apply one follower output: store and publish events, publish notices, log errors.
    pub fn ingest(&self, output: FollowerOutput) {
        match output {
            FollowerOutput::Event(event) => {
                {
                    let mut store = self.shared.lock();
                    store.stats.add(&event);
                    store.ring.push(event.clone());
                }
                self.shared.hub.publish(&WireMessage::Line(event));
            }
            FollowerOutput::Notice(msg) => {
                let now = Utc::now().timestamp_millis();
                self.shared.hub.publish(&WireMessage::notice(msg, now));
            }
            FollowerOutput::Error(err) => {
                tracing::warn!(error = %err, "follower reported an error");
            }
        }
    }

    /// Broadcast a stats snapshot taken at `now_ms`.
    pub fn publish_stats(&self, now_ms: i64) {
        let snapshot = self.shared.stats_at(now_ms);
        self.shared.hub.publish(&WireMessage::Stats(snapshot));
    }

    pub fn recent(&self, query: RecentQuery) -> Vec<LogEvent> {
        self.shared.recent(query)
    }

    pub fn stats_at(&self, now_ms: i64) -> StatsSnapshot {
        self.shared.stats_at(now_ms)
    }

    pub fn subscribe(&self) -> Subscription {
        self.shared.hub.subscribe(Utc::now().timestamp_millis())
    }

    /// Start `follower` and the ingestion loop. The loop ends on [`ObserverHandle::shutdown`]
    /// or when the follower drops its output channel; either way the follower is stopped.
    pub fn spawn(self, follower: Box<dyn SourceFollower>) -> (ObserverHandle, JoinHandle<()>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(());
        let shared = Arc::clone(&self.shared);

        let (sink, rx) = FollowerSink::channel();
        let task = tokio::spawn(async move {
            self.run(follower, sink, rx, shutdown_rx).await;
            drop(done_tx);
        });

        let handle = ObserverHandle {
            shared,
            shutdown: Arc::new(shutdown_tx),
            done: done_rx,
        };
        (handle, task)
    }

    async fn run(
        self,
        mut follower: Box<dyn SourceFollower>,
        sink: FollowerSink,
        mut rx: mpsc::UnboundedReceiver<FollowerOutput>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!(
            follower = follower.name(),
            push_interval_ms = self.push_interval.as_millis() as u64,
            "ingestion started"
        );
        follower.start(sink);

        let mut ticker = time::interval_at(Instant::now() + self.push_interval, self.push_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                output = rx.recv() => match output {
                    Some(output) => self.ingest(output),
                    None => {
                        tracing::info!(follower = follower.name(), "follower output closed");
                        break;
                    }
                },
                _ = ticker.tick() => self.publish_stats(Utc::now().timestamp_millis()),
                _ = stopped(&mut shutdown) => break,
            }
        }

        follower.stop().await;

        // Whatever the follower produced before it stopped is still applied.
        while let Ok(output) = rx.try_recv() {
            self.ingest(output);
        }
        tracing::info!(follower = follower.name(), "ingestion stopped");
    }
}

/// Read side of a running coordinator. Cheap to clone.
#[derive(Clone)]
pub struct ObserverHandle {
    shared: Arc<Shared>,
    shutdown: Arc<watch::Sender<bool>>,
    done: watch::Receiver<()>,
}

impl ObserverHandle {
    pub fn recent(&self, query: RecentQuery) -> Vec<LogEvent> {
        self.shared.recent(query)
    }

    /// Snapshot at wall-clock now.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats_at(Utc::now().timestamp_millis())
    }

    pub fn subscribe(&self) -> Subscription {
        self.shared.hub.subscribe(Utc::now().timestamp_millis())
    }

    pub fn is_finished(&self) -> bool {
        self.done.has_changed().is_err()
    }

    /// Resolves once the ingestion loop has ended, for whatever reason.
    pub async fn finished(&self) {
        let mut done = self.done.clone();
        while done.changed().await.is_ok() {}
    }

    /// Stop the follower and wait for the ingestion loop to finish. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        self.finished().await;
    }
}
