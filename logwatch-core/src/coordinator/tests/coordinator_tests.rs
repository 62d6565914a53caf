use crate::conf::LogwatchConfig;
use crate::coordinator::{IngestionCoordinator, RecentQuery};
use crate::event::{LogEvent, parse_line_at};
use crate::fanout::WireMessage;
use crate::follower::{FollowerError, FollowerOutput, FollowerSink, SourceFollower};
use async_trait::async_trait;
use chrono::Utc;
use pretty_assertions::assert_eq;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const NOW: i64 = 1_761_118_429_598;

fn config(recent_limit: usize) -> LogwatchConfig {
    let mut cfg = LogwatchConfig::default();
    cfg.retention.recent_limit = recent_limit;
    cfg
}

fn event(msg: &str, ts: i64) -> LogEvent {
    parse_line_at(&format!("bad-ts\tERROR\tfdc\t{msg}"), ts)
}

fn raws(events: &[LogEvent]) -> Vec<String> {
    events.iter().map(|e| e.raw.clone()).collect()
}

/// Emits a fixed script on start and keeps its sink open until stopped.
struct ScriptedFollower {
    script: Vec<FollowerOutput>,
    sink: Option<FollowerSink>,
    stopped: Arc<AtomicBool>,
}

impl ScriptedFollower {
    fn new(script: Vec<FollowerOutput>) -> (Self, Arc<AtomicBool>) {
        let stopped = Arc::new(AtomicBool::new(false));
        let follower = Self {
            script,
            sink: None,
            stopped: Arc::clone(&stopped),
        };
        (follower, stopped)
    }
}

#[async_trait]
impl SourceFollower for ScriptedFollower {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn start(&mut self, sink: FollowerSink) {
        for output in self.script.drain(..) {
            match output {
                FollowerOutput::Event(e) => sink.event(e),
                FollowerOutput::Notice(n) => sink.notice(n),
                FollowerOutput::Error(err) => sink.error(err),
            }
        }
        self.sink = Some(sink);
    }

    async fn stop(&mut self) {
        self.sink = None;
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[test]
fn recent_returns_newest_events_oldest_first() {
    // Arrange
    let coordinator = IngestionCoordinator::new(&config(3));
    for (i, msg) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        coordinator.ingest(FollowerOutput::Event(event(msg, NOW + i as i64)));
    }

    // Act
    let all = coordinator.recent(RecentQuery::default());
    let two = coordinator.recent(RecentQuery {
        limit: Some(2),
        since: None,
    });

    // Assert
    assert_eq!(
        raws(&all),
        vec!["bad-ts\tERROR\tfdc\tc", "bad-ts\tERROR\tfdc\td", "bad-ts\tERROR\tfdc\te"]
    );
    assert_eq!(raws(&two), vec!["bad-ts\tERROR\tfdc\td", "bad-ts\tERROR\tfdc\te"]);
}

#[test]
fn recent_limit_is_capped_and_since_filters() {
    let coordinator = IngestionCoordinator::new(&config(4));
    for i in 0..4 {
        coordinator.ingest(FollowerOutput::Event(event(&format!("m{i}"), NOW + i * 1_000)));
    }

    let capped = coordinator.recent(RecentQuery {
        limit: Some(100),
        since: None,
    });
    let since = coordinator.recent(RecentQuery {
        limit: None,
        since: Some(NOW + 2_000),
    });
    let none = coordinator.recent(RecentQuery {
        limit: Some(0),
        since: None,
    });

    assert_eq!(capped.len(), 4);
    assert_eq!(
        since.iter().map(|e| e.ts).collect::<Vec<_>>(),
        vec![NOW + 2_000, NOW + 3_000]
    );
    assert!(none.is_empty());
}

#[test]
fn ingested_events_feed_stats() {
    let coordinator = IngestionCoordinator::new(&config(10));
    coordinator.ingest(FollowerOutput::Event(event("boom", NOW)));
    coordinator.ingest(FollowerOutput::Event(parse_line_at(
        "bad-ts\tWARNING\tfdc\tprocessed round 1140981",
        NOW,
    )));
    coordinator.ingest(FollowerOutput::Notice("spawned: docker".to_string()));

    let snapshot = coordinator.stats_at(NOW + 3_000);

    assert_eq!(snapshot.totals.error, 1);
    assert_eq!(snapshot.totals.warning, 1);
    assert_eq!(snapshot.last_round, Some(1_140_981));
    assert_eq!(snapshot.seconds_since_last_round, Some(3));
    assert_eq!(coordinator.recent(RecentQuery::default()).len(), 2);
}

#[tokio::test]
async fn ingest_publishes_lines_and_notices_but_not_errors() {
    // Arrange
    let coordinator = IngestionCoordinator::new(&config(10));
    let mut sub = coordinator.subscribe();
    let line = event("boom", NOW);

    // Act
    coordinator.ingest(FollowerOutput::Event(line.clone()));
    coordinator.ingest(FollowerOutput::Error(FollowerError::File {
        path: "/nope".into(),
        source: io::Error::from(io::ErrorKind::NotFound),
    }));
    coordinator.ingest(FollowerOutput::Notice("watching /tmp/x".to_string()));

    // Assert
    assert!(matches!(sub.recv_message().await, Some(WireMessage::Hello(_))));
    assert_eq!(sub.recv_message().await, Some(WireMessage::Line(line)));
    match sub.recv_message().await {
        Some(WireMessage::Notice(notice)) => assert_eq!(notice.msg, "watching /tmp/x"),
        other => panic!("expected notice, got {other:?}"),
    }
}

#[tokio::test]
async fn spawned_pipeline_stores_events_and_stops_the_follower() {
    // Arrange
    let coordinator = IngestionCoordinator::new(&config(10));
    let mut sub = coordinator.subscribe();
    let now = Utc::now().timestamp_millis();
    let (follower, stopped) = ScriptedFollower::new(vec![
        FollowerOutput::Notice("spawned: scripted".to_string()),
        FollowerOutput::Event(event("first", now)),
        FollowerOutput::Event(event("second", now)),
    ]);

    // Act
    let (handle, task) = coordinator.spawn(Box::new(follower));
    let mut seen = Vec::new();
    while seen.len() < 4 {
        let msg = tokio::time::timeout(Duration::from_secs(5), sub.recv_message())
            .await
            .unwrap()
            .unwrap();
        seen.push(msg);
    }
    handle.shutdown().await;
    task.await.unwrap();

    // Assert
    assert!(matches!(seen[0], WireMessage::Hello(_)));
    assert!(matches!(seen[1], WireMessage::Notice(_)));
    assert!(matches!(seen[2], WireMessage::Line(_)));
    assert!(matches!(seen[3], WireMessage::Line(_)));
    assert!(stopped.load(Ordering::SeqCst));
    assert!(handle.is_finished());
    assert_eq!(
        raws(&handle.recent(RecentQuery::default())),
        vec!["bad-ts\tERROR\tfdc\tfirst", "bad-ts\tERROR\tfdc\tsecond"]
    );
    assert_eq!(handle.stats().totals.error, 2);
}

#[tokio::test(start_paused = true)]
async fn stats_are_pushed_on_the_configured_interval() {
    // Arrange
    let mut cfg = config(10);
    cfg.stats.push_interval_ms = 5_000;
    let coordinator = IngestionCoordinator::new(&cfg);
    let mut sub = coordinator.subscribe();
    let (follower, _) = ScriptedFollower::new(Vec::new());

    // Act
    let (handle, task) = coordinator.spawn(Box::new(follower));
    let hello = sub.recv_message().await;
    let stats = sub.recv_message().await;
    handle.shutdown().await;
    task.await.unwrap();

    // Assert
    assert!(matches!(hello, Some(WireMessage::Hello(_))));
    match stats {
        Some(WireMessage::Stats(snapshot)) => {
            assert_eq!(snapshot.window_minutes, 60);
            assert_eq!(snapshot.totals.total(), 0);
        }
        other => panic!("expected stats, got {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let coordinator = IngestionCoordinator::new(&config(10));
    let (follower, stopped) = ScriptedFollower::new(Vec::new());
    let (handle, task) = coordinator.spawn(Box::new(follower));

    handle.shutdown().await;
    handle.shutdown().await;
    task.await.unwrap();

    assert!(stopped.load(Ordering::SeqCst));
}
