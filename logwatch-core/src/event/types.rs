use serde::{Deserialize, Serialize};
use std::fmt;

const MINUTE_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Info,
    Warning,
    Error,
    Critical,
    Unknown,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Unknown => "UNKNOWN",
        }
    }

    /// Case-insensitive match of a header level token. `UNKNOWN` is never a declared level.
    pub fn from_token(token: &str) -> Option<Level> {
        match token.to_ascii_uppercase().as_str() {
            "INFO" => Some(Level::Info),
            "WARNING" => Some(Level::Warning),
            "ERROR" => Some(Level::Error),
            "CRITICAL" => Some(Level::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain tokens lifted out of the message body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl ParsedFields {
    pub fn is_empty(&self) -> bool {
        self.round.is_none() && self.network.is_none() && self.protocol.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Epoch milliseconds.
    pub ts: i64,

    #[serde(rename = "isoTs")]
    pub iso_ts: String,

    pub level: Level,

    /// The cleaned line: ANSI sequences and trailing line terminators removed.
    pub raw: String,

    pub parsed: ParsedFields,

    /// Produced by the history backfill rather than live tailing.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub seed: bool,
}

impl LogEvent {
    /// Calendar minute the event falls into (`floor(ts / 60000)`).
    pub fn minute(&self) -> i64 {
        self.ts.div_euclid(MINUTE_MS)
    }

    pub fn into_seed(mut self) -> Self {
        self.seed = true;
        self
    }
}
