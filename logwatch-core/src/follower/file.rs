use crate::conf::FileSourceConfig;
use crate::follower::error::FollowerError;
use crate::follower::lines::LineBuffer;
use crate::follower::{FollowerSink, FollowerTask, SourceFollower, stopped};
use async_trait::async_trait;
use std::fs::Metadata;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

/// Largest slice of an append read in one go.
const READ_CHUNK: u64 = 1024 * 1024;

/// Device + inode pair; a change means the path now names a different file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    pub dev: u64,
    pub ino: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    pub fn of(meta: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: meta.dev(),
            ino: meta.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn of(_meta: &Metadata) -> Option<Self> {
        None
    }
}

/// Result of handling one change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The path could not be stat'ed; nothing changed.
    Missing,
    /// A different file now lives at the path; the offset jumped to its size.
    Rotated { size: u64 },
    /// The file shrank below the offset; the offset jumped to the new size.
    Truncated { from: u64, to: u64 },
    Unchanged,
    /// New bytes were consumed.
    Appended { bytes: u64, lines: usize },
    /// Reading the new range failed; bytes consumed before the failure stay consumed.
    ReadFailed,
}

/// Offset-tracking tail state for one path.
///
/// Invariants:
/// - Bytes before `offset` are never read again
/// - `offset` only moves backwards on rotation or truncation
#[derive(Debug)]
pub struct FileTail {
    path: PathBuf,
    offset: u64,
    identity: Option<FileIdentity>,
    partial: LineBuffer,
}

impl FileTail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            identity: None,
            partial: LineBuffer::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn identity(&self) -> Option<FileIdentity> {
        self.identity
    }

    pub fn has_partial_line(&self) -> bool {
        !self.partial.is_empty()
    }

    /// Emit the last `tail_lines` complete lines as seed events and start the offset at the
    /// end of what was read. An unterminated final fragment waits in the partial buffer.
    pub async fn seed(&mut self, tail_lines: usize, sink: &FollowerSink) {
        let read = async {
            let meta = fs::metadata(&self.path).await?;
            let content = fs::read(&self.path).await?;
            Ok::<_, std::io::Error>((meta, content))
        };
        let (meta, content) = match read.await {
            Ok(read) => read,
            Err(source) => {
                sink.error(FollowerError::File {
                    path: self.path.clone(),
                    source,
                });
                return;
            }
        };

        self.identity = FileIdentity::of(&meta);
        self.offset = content.len() as u64;
        self.partial.clear();

        let mut lines = self.partial.push(&content);
        let skip = lines.len().saturating_sub(tail_lines);
        sink.lines(lines.split_off(skip), true);

        tracing::debug!(
            path = %self.path.display(),
            offset = self.offset,
            "file seeded"
        );
    }

    /// Handle one change notification for the path.
    pub async fn on_change(&mut self, sink: &FollowerSink) -> ChangeOutcome {
        let Ok(meta) = fs::metadata(&self.path).await else {
            return ChangeOutcome::Missing;
        };
        let size = meta.len();
        let current = FileIdentity::of(&meta);

        let replaced = matches!(
            (self.identity, current),
            (Some(known), Some(now)) if known != now
        );
        if current.is_some() {
            self.identity = current;
        }

        if replaced {
            self.offset = size;
            self.partial.clear();
            sink.notice("file rotation detected; skipping existing content");
            return ChangeOutcome::Rotated { size };
        }

        if size < self.offset {
            let from = self.offset;
            sink.notice(format!("file truncated from {from} to {size}"));
            self.offset = size;
            self.partial.clear();
            return ChangeOutcome::Truncated { from, to: size };
        }

        if size == self.offset {
            return ChangeOutcome::Unchanged;
        }

        let before = self.offset;
        let mut emitted = 0;
        if let Err(source) = self.consume_range(size, sink, &mut emitted).await {
            sink.error(FollowerError::File {
                path: self.path.clone(),
                source,
            });
            return ChangeOutcome::ReadFailed;
        }

        ChangeOutcome::Appended {
            bytes: self.offset - before,
            lines: emitted,
        }
    }

    /// Read `[offset, end)` in bounded chunks, emitting lines as they complete. The offset
    /// advances per chunk, so a failure part way keeps what was already consumed.
    async fn consume_range(
        &mut self,
        end: u64,
        sink: &FollowerSink,
        emitted: &mut usize,
    ) -> std::io::Result<()> {
        let mut file = fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;

        let mut chunk = vec![0u8; (end - self.offset).min(READ_CHUNK) as usize];
        while self.offset < end {
            let want = (end - self.offset).min(READ_CHUNK) as usize;
            let n = file.read(&mut chunk[..want]).await?;
            if n == 0 {
                // Shrunk since the stat; the next notification sorts it out.
                break;
            }

            let lines = self.partial.push(&chunk[..n]);
            *emitted += lines.iter().filter(|l| !l.trim().is_empty()).count();
            sink.lines(lines, false);
            self.offset += n as u64;
        }
        Ok(())
    }
}

/// Tails a growing file, polling it for changes.
#[derive(Debug)]
pub struct FileFollower {
    path: PathBuf,
    tail_lines: usize,
    poll_interval: Duration,
    task: FollowerTask,
}

impl FileFollower {
    pub fn new(path: impl Into<PathBuf>, tail_lines: usize, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            tail_lines,
            poll_interval,
            task: FollowerTask::default(),
        }
    }

    pub fn from_config(cfg: &FileSourceConfig) -> Self {
        Self::new(
            &cfg.path,
            cfg.tail_lines,
            Duration::from_millis(cfg.poll_interval_ms),
        )
    }
}

#[async_trait]
impl SourceFollower for FileFollower {
    fn name(&self) -> &'static str {
        "file"
    }

    fn start(&mut self, sink: FollowerSink) {
        if self.task.is_running() {
            tracing::warn!("file follower already running");
            return;
        }
        let tail = FileTail::new(&self.path);
        let tail_lines = self.tail_lines;
        let poll_interval = self.poll_interval;
        self.task.spawn(move |shutdown| {
            follow_file(tail, tail_lines, poll_interval, sink, shutdown)
        });
    }

    async fn stop(&mut self) {
        self.task.stop().await;
    }
}

async fn follow_file(
    mut tail: FileTail,
    tail_lines: usize,
    poll_interval: Duration,
    sink: FollowerSink,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::select! {
        _ = tail.seed(tail_lines, &sink) => {}
        _ = stopped(&mut shutdown) => return,
    }

    sink.notice(format!("watching {}", tail.path().display()));

    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = tail.on_change(&sink).await;
                tracing::trace!(?outcome, offset = tail.offset(), "file polled");
            }
            _ = stopped(&mut shutdown) => return,
        }
    }
}
