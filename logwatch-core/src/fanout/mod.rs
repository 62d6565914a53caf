//! Real-time fan-out: every consumer gets the same `{type, data}` envelopes.
//!
//! Delivery is best effort. Envelopes are serialized once and shared; a subscriber that
//! falls behind skips what it missed instead of slowing the producer down.

use crate::event::LogEvent;
use crate::stats::StatsSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

pub const PROTOCOL_VERSION: u32 = 1;

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum WireMessage {
    Line(LogEvent),
    Notice(NoticePayload),
    Stats(StatsSnapshot),
    Hello(HelloPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticePayload {
    pub msg: String,
    pub ts: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    pub version: u32,
    pub now: i64,
}

impl WireMessage {
    pub fn hello(now: i64) -> Self {
        WireMessage::Hello(HelloPayload {
            version: PROTOCOL_VERSION,
            now,
        })
    }

    pub fn notice(msg: impl Into<String>, ts: i64) -> Self {
        WireMessage::Notice(NoticePayload {
            msg: msg.into(),
            ts,
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("serialize wire message")
    }
}

/// Broadcast point for pre-serialized envelopes.
#[derive(Debug, Clone)]
pub struct Hub {
    tx: broadcast::Sender<Arc<str>>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns how many subscribers the envelope was queued for. Zero is not an error.
    pub fn publish(&self, message: &WireMessage) -> usize {
        let frame: Arc<str> = Arc::from(message.to_json());
        self.tx.send(frame).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// The first frame a new subscriber sees is `hello`.
    pub fn subscribe(&self, now: i64) -> Subscription {
        Subscription {
            hello: Some(Arc::from(WireMessage::hello(now).to_json())),
            rx: self.tx.subscribe(),
            missed: 0,
        }
    }
}

#[derive(Debug)]
pub struct Subscription {
    hello: Option<Arc<str>>,
    rx: broadcast::Receiver<Arc<str>>,
    missed: u64,
}

impl Subscription {
    /// Next serialized envelope, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        if let Some(hello) = self.hello.take() {
            return Some(hello);
        }
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.missed += n;
                    tracing::debug!(skipped = n, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Like [`Subscription::recv`] but decoded.
    pub async fn recv_message(&mut self) -> Option<WireMessage> {
        loop {
            let frame = self.recv().await?;
            match serde_json::from_str(&frame) {
                Ok(message) => return Some(message),
                Err(err) => tracing::warn!(error = %err, "undecodable envelope"),
            }
        }
    }

    /// Envelopes dropped because this subscriber fell behind.
    pub fn missed(&self) -> u64 {
        self.missed
    }
}

#[cfg(test)]
mod tests;
