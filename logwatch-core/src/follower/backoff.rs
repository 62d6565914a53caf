use std::time::Duration;

/// Doubling reconnect delay, capped. Lives as long as its follower; never reset on relaunch.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial.min(max),
            max,
        }
    }

    /// The delay the next failure will wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Return the delay to wait now and double the one after it.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}
