use crate::event::{Level, LogEvent, contains_bounded_token};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MINUTE_MS: i64 = 60_000;

/// Levels that are counted; `INFO` and `UNKNOWN` only ever contribute through keyword hints.
const COUNTED_LEVELS: [Level; 3] = [Level::Warning, Level::Error, Level::Critical];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    #[serde(rename = "WARNING")]
    pub warning: u64,

    #[serde(rename = "ERROR")]
    pub error: u64,

    #[serde(rename = "CRITICAL")]
    pub critical: u64,
}

impl LevelCounts {
    fn increment(&mut self, level: Level) {
        match level {
            Level::Warning => self.warning += 1,
            Level::Error => self.error += 1,
            Level::Critical => self.critical += 1,
            Level::Info | Level::Unknown => {}
        }
    }

    fn accumulate(&mut self, other: &LevelCounts) {
        self.warning += other.warning;
        self.error += other.error;
        self.critical += other.critical;
    }

    pub fn total(&self) -> u64 {
        self.warning + self.error + self.critical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsBucket {
    pub minute: i64,

    #[serde(flatten)]
    pub counts: LevelCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub generated_at: i64,
    pub window_minutes: u32,
    pub buckets: Vec<StatsBucket>,
    pub totals: LevelCounts,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_round: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds_since_last_round: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
struct LastRound {
    round: u64,
    seen_at: i64,
}

#[derive(Debug, Clone)]
pub struct StatsAggregator {
    window_minutes: u32,
    buckets: BTreeMap<i64, LevelCounts>,
    last_round: Option<LastRound>,
}

impl StatsAggregator {
    pub fn new(window_minutes: u32) -> Self {
        Self {
            window_minutes,
            buckets: BTreeMap::new(),
            last_round: None,
        }
    }

    pub fn window_minutes(&self) -> u32 {
        self.window_minutes
    }

    pub fn add(&mut self, event: &LogEvent) {
        let counts = self.buckets.entry(event.minute()).or_default();

        match event.level {
            Level::Warning | Level::Error | Level::Critical => counts.increment(event.level),
            Level::Unknown => {
                // Keyword hints for lines whose level token failed to parse; each may match.
                let upper = event.raw.to_uppercase();
                for level in COUNTED_LEVELS {
                    if contains_bounded_token(&upper, level.as_str()) {
                        counts.increment(level);
                    }
                }
            }
            Level::Info => {}
        }

        // Most recent round wins, not the highest.
        if let Some(round) = event.parsed.round {
            self.last_round = Some(LastRound {
                round,
                seen_at: event.ts,
            });
        }

        self.evict(event.ts);
    }

    pub fn snapshot(&mut self, now_ms: i64) -> StatsSnapshot {
        self.evict(now_ms);

        let window = self.window_minutes as usize;
        let skip = self.buckets.len().saturating_sub(window);
        let buckets: Vec<StatsBucket> = self
            .buckets
            .iter()
            .skip(skip)
            .map(|(minute, counts)| StatsBucket {
                minute: *minute,
                counts: *counts,
            })
            .collect();

        let mut totals = LevelCounts::default();
        for bucket in &buckets {
            totals.accumulate(&bucket.counts);
        }

        StatsSnapshot {
            generated_at: now_ms,
            window_minutes: self.window_minutes,
            buckets,
            totals,
            last_round: self.last_round.map(|r| r.round),
            seconds_since_last_round: self
                .last_round
                .map(|r| (now_ms - r.seen_at).max(0) / 1000),
        }
    }

    /// Drop every bucket that lies entirely before the trailing window ending at `now_ms`.
    fn evict(&mut self, now_ms: i64) {
        let current_minute = now_ms.div_euclid(MINUTE_MS);
        let cutoff = current_minute - i64::from(self.window_minutes) + 1;
        self.buckets = self.buckets.split_off(&cutoff);
    }
}
