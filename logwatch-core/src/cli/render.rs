use crate::event::{Level, LogEvent};
use crate::fanout::{NoticePayload, WireMessage};
use crate::logging::OutputMode;
use crate::stats::render_stats;
use owo_colors::OwoColorize;

/// What to do with one real-time frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Print as a line.
    Line(String),
    /// Clear the screen and draw.
    Dashboard(String),
    Nothing,
}

pub fn render_frame(mode: OutputMode, frame: &str) -> Rendered {
    if mode == OutputMode::Json {
        return Rendered::Line(frame.to_string());
    }

    let Ok(message) = serde_json::from_str::<WireMessage>(frame) else {
        // Keep undecodable frames visible in pretty mode; they would only garble a dashboard.
        return match mode {
            OutputMode::Pretty => Rendered::Line(frame.to_string()),
            _ => Rendered::Nothing,
        };
    };

    match (mode, message) {
        (OutputMode::Pretty, WireMessage::Line(event)) => Rendered::Line(format_event(&event)),
        (OutputMode::Pretty, WireMessage::Notice(notice)) => {
            Rendered::Line(format_notice(&notice))
        }
        (OutputMode::Stats, WireMessage::Stats(snapshot)) => {
            Rendered::Dashboard(render_stats(&snapshot))
        }
        (OutputMode::Stats, WireMessage::Hello(_)) => {
            Rendered::Dashboard("Waiting for the first stats push...".to_string())
        }
        _ => Rendered::Nothing,
    }
}

/// `[LEVEL] iso raw`, with seed events marked.
pub fn format_event(event: &LogEvent) -> String {
    let seed = if event.seed { " (seed)" } else { "" };
    format!(
        "[{}] {}{} {}",
        level_label(event.level),
        event.iso_ts.dimmed(),
        seed.dimmed(),
        event.raw
    )
}

pub fn format_notice(notice: &NoticePayload) -> String {
    format!("{} {}", "--".cyan().bold(), notice.msg.cyan())
}

fn level_label(level: Level) -> String {
    let label = level.as_str();
    match level {
        Level::Critical => label.magenta().bold().to_string(),
        Level::Error => label.red().bold().to_string(),
        Level::Warning => label.yellow().bold().to_string(),
        Level::Info => label.green().to_string(),
        Level::Unknown => label.dimmed().to_string(),
    }
}
