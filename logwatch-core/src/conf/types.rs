use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Process,
    File,
}

/// Complete runtime configuration. Every section falls back to its defaults when omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogwatchConfig {
    /// Which follower feeds the pipeline.
    pub source: SourceKind,

    pub process: ProcessSourceConfig,

    pub file: FileSourceConfig,

    pub retention: RetentionConfig,

    pub stats: StatsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessSourceConfig {
    /// Container (or other target) whose logs are followed.
    pub container: String,

    /// Log-producing executable, e.g. `docker`.
    pub program: String,

    /// Run the program through `sudo`.
    pub use_sudo: bool,

    /// History lookback for the seed phase (`--since`). Empty disables seeding.
    pub since: String,

    pub seed_timeout_ms: u64,

    pub initial_backoff_ms: u64,

    pub max_backoff_ms: u64,
}

impl Default for ProcessSourceConfig {
    fn default() -> Self {
        Self {
            container: "fdc-observer".to_string(),
            program: "docker".to_string(),
            use_sudo: false,
            since: "1h".to_string(),
            seed_timeout_ms: 30_000,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSourceConfig {
    pub path: PathBuf,

    /// Lines of existing content replayed as seed events.
    pub tail_lines: usize,

    pub poll_interval_ms: u64,
}

impl Default for FileSourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            tail_lines: 2_000,
            poll_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionConfig {
    /// Capacity of the recent-event ring.
    pub recent_limit: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            recent_limit: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatsConfig {
    pub window_minutes: u32,

    pub push_interval_ms: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_minutes: 60,
            push_interval_ms: 5_000,
        }
    }
}
