use crate::event::types::{Level, LogEvent, ParsedFields};
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static ANSI_SEQUENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("ansi pattern compiles"));
static NETWORK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"network:([A-Za-z0-9_-]+)").expect("network pattern compiles"));
static PROTOCOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"protocol:([A-Za-z0-9_-]+)").expect("protocol pattern compiles"));
static ROUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"round:([0-9]{3,})").expect("round pattern compiles"));
static PROCESSED_ROUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)processed round ([0-9]{3,})").expect("processed round pattern compiles")
});

/// Fallback scan order when the header carries no recognizable level.
///
/// The scan is case-sensitive on purpose: `plain text warning occurred` must stay `UNKNOWN`.
/// Only the header field is compared case-insensitively.
const FALLBACK_PRIORITY: [Level; 4] = [Level::Critical, Level::Error, Level::Warning, Level::Info];

/// Parse a raw line, stamping unparseable timestamps with the current wall clock.
pub fn parse_line(raw: &str) -> LogEvent {
    parse_line_at(raw, Utc::now().timestamp_millis())
}

/// Parse a raw line; `now_ms` is used when the line carries no usable timestamp.
pub fn parse_line_at(raw: &str, now_ms: i64) -> LogEvent {
    let cleaned = clean_line(raw);
    let parts: Vec<&str> = cleaned.split('\t').collect();

    let ts = parts
        .first()
        .and_then(|field| parse_timestamp(field))
        .unwrap_or(now_ms);

    let level = detect_level(&parts, &cleaned);
    let parsed = parse_fields(&message_body(&parts, &cleaned));

    LogEvent {
        ts,
        iso_ts: iso_timestamp(ts),
        level,
        raw: cleaned,
        parsed,
        seed: false,
    }
}

/// Strip trailing line terminators, then every `ESC [ ... m` color sequence.
pub fn clean_line(raw: &str) -> String {
    let trimmed = raw.trim_end_matches(['\r', '\n']);
    ANSI_SEQUENCE.replace_all(trimmed, "").into_owned()
}

/// True when `token` appears delimited by tabs on both sides or spaces on both sides.
pub fn contains_bounded_token(haystack: &str, token: &str) -> bool {
    haystack.contains(&format!("\t{token}\t")) || haystack.contains(&format!(" {token} "))
}

//-----------------------------------------------------------------------------
// Timestamp
//-----------------------------------------------------------------------------

/// `2025-10-22 07:33:49,598` -> `2025-10-22T07:33:49.598Z`, read as UTC.
fn parse_timestamp(field: &str) -> Option<i64> {
    let candidate = format!("{}Z", field.replacen(',', ".", 1).replacen(' ', "T", 1));
    DateTime::parse_from_rfc3339(&candidate)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn iso_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

//-----------------------------------------------------------------------------
// Level
//-----------------------------------------------------------------------------

fn detect_level(parts: &[&str], cleaned: &str) -> Level {
    if let Some(level) = parts.get(1).and_then(|token| Level::from_token(token.trim())) {
        return level;
    }

    FALLBACK_PRIORITY
        .into_iter()
        .find(|level| contains_bounded_token(cleaned, level.as_str()))
        .unwrap_or(Level::Unknown)
}

//-----------------------------------------------------------------------------
// Message body and fields
//-----------------------------------------------------------------------------

fn message_body(parts: &[&str], cleaned: &str) -> String {
    [3, 2]
        .into_iter()
        .filter_map(|start| parts.get(start..))
        .map(|rest| rest.join("\t"))
        .find(|body| !body.is_empty())
        .unwrap_or_else(|| cleaned.to_string())
}

fn parse_fields(message: &str) -> ParsedFields {
    let capture = |re: &Regex| {
        re.captures(message)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };

    // Processed-round announcements win over inline round tags.
    let round = capture(&PROCESSED_ROUND)
        .and_then(|r| r.parse().ok())
        .or_else(|| capture(&ROUND).and_then(|r| r.parse().ok()));

    ParsedFields {
        round,
        network: capture(&NETWORK),
        protocol: capture(&PROTOCOL),
    }
}
