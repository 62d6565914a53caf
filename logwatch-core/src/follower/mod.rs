//! Source followers: self-driving tasks that turn a growing log source into parsed events.
//!
//! Two strategies implement [`SourceFollower`]:
//! - [`ProcessFollower`] seeds recent history from a one-shot command, then follows a
//!   long-running command and relaunches it with capped exponential backoff whenever it exits.
//! - [`FileFollower`] seeds the tail of a file, then polls it for growth, rotation and
//!   truncation.
//!
//! A follower writes to a [`FollowerSink`]. The receiving side sees one ordered stream of
//! [`FollowerOutput`] values per follower; once `stop()` returns nothing more is sent.

mod backoff;
mod error;
mod file;
mod lines;
mod process;

#[cfg(test)]
mod tests;

pub use backoff::Backoff;
pub use error::FollowerError;
pub use file::{ChangeOutcome, FileFollower, FileIdentity, FileTail};
pub use lines::LineBuffer;
pub use process::{CommandSpec, LaunchPlan, ProcessFollower, ProcessTiming};

use crate::conf::{LogwatchConfig, SourceKind};
use crate::event::{LogEvent, parse_line};
use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

#[derive(Debug)]
pub enum FollowerOutput {
    Event(LogEvent),
    Notice(String),
    Error(FollowerError),
}

/// Unbounded so a follower never waits on its consumer.
#[derive(Debug, Clone)]
pub struct FollowerSink {
    tx: mpsc::UnboundedSender<FollowerOutput>,
}

impl FollowerSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FollowerOutput>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn event(&self, event: LogEvent) {
        let _ = self.tx.send(FollowerOutput::Event(event));
    }

    pub fn notice(&self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::info!(notice = %msg, "follower notice");
        let _ = self.tx.send(FollowerOutput::Notice(msg));
    }

    pub fn error(&self, err: FollowerError) {
        tracing::warn!(error = %err, "follower error");
        let _ = self.tx.send(FollowerOutput::Error(err));
    }

    /// Parse and emit every non-blank line.
    pub(crate) fn lines(&self, lines: Vec<String>, seed: bool) {
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let event = parse_line(&line);
            self.event(if seed { event.into_seed() } else { event });
        }
    }
}

#[async_trait]
pub trait SourceFollower: Send {
    fn name(&self) -> &'static str;

    /// Begin seeding and live following in the background. A running follower ignores
    /// repeated calls.
    fn start(&mut self, sink: FollowerSink);

    /// Tear down timers, watches and child processes. Returns once the follower task has
    /// finished, after which no further output is produced.
    async fn stop(&mut self);
}

/// Background task plus the shutdown signal shared by both follower kinds.
#[derive(Debug, Default)]
pub(crate) struct FollowerTask {
    running: Option<(watch::Sender<bool>, tokio::task::JoinHandle<()>)>,
}

impl FollowerTask {
    pub(crate) fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub(crate) fn spawn<F, Fut>(&mut self, body: F)
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(body(rx));
        self.running = Some((tx, handle));
    }

    pub(crate) async fn stop(&mut self) {
        let Some((tx, handle)) = self.running.take() else {
            return;
        };
        let _ = tx.send(true);
        if let Err(err) = handle.await {
            tracing::warn!(error = %err, "follower task ended abnormally");
        }
    }
}

/// Resolves once a stop has been requested (or the follower handle is gone).
pub(crate) async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stop = *shutdown.borrow_and_update();
        if stop || shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Build the follower selected by configuration.
pub fn build_follower(cfg: &LogwatchConfig) -> Box<dyn SourceFollower> {
    match cfg.source {
        SourceKind::Process => Box::new(ProcessFollower::from_config(&cfg.process)),
        SourceKind::File => Box::new(FileFollower::from_config(&cfg.file)),
    }
}
