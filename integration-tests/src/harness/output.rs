use logwatch_core::event::LogEvent;
use logwatch_core::follower::{CommandSpec, FollowerOutput};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Instant, timeout_at};

/// Everything a follower produced, split by kind and kept in arrival order.
#[derive(Debug, Default)]
pub struct OutputLog {
    pub events: Vec<LogEvent>,
    pub notices: Vec<String>,
    pub errors: Vec<String>,
    /// The follower dropped its sink.
    pub closed: bool,
}

impl OutputLog {
    pub fn raws(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.raw.as_str()).collect()
    }

    pub fn has_notice(&self, needle: &str) -> bool {
        self.notices.iter().any(|n| n.contains(needle))
    }

    fn record(&mut self, output: FollowerOutput) {
        match output {
            FollowerOutput::Event(e) => self.events.push(e),
            FollowerOutput::Notice(n) => self.notices.push(n),
            FollowerOutput::Error(e) => self.errors.push(e.to_string()),
        }
    }
}

/// Receive into `log` until `done` holds, the channel closes, or `limit` passes.
/// Returns whether `done` was reached.
pub async fn collect_until<F>(
    rx: &mut UnboundedReceiver<FollowerOutput>,
    log: &mut OutputLog,
    limit: Duration,
    mut done: F,
) -> bool
where
    F: FnMut(&OutputLog) -> bool,
{
    let deadline = Instant::now() + limit;
    while !done(log) {
        match timeout_at(deadline, rx.recv()).await {
            Ok(Some(output)) => log.record(output),
            Ok(None) => {
                log.closed = true;
                return done(log);
            }
            Err(_) => return false,
        }
    }
    true
}

pub async fn wait_for_notice(
    rx: &mut UnboundedReceiver<FollowerOutput>,
    log: &mut OutputLog,
    needle: &str,
) -> bool {
    collect_until(rx, log, Duration::from_secs(5), |l| l.has_notice(needle)).await
}

/// `sh -c <script>`.
pub fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh", ["-c", script])
}
