use crate::conf::error::ConfigError;
use crate::conf::types::{LogwatchConfig, SourceKind};

/// Reject configurations the pipeline cannot run with. Only the selected source is checked.
pub fn validate(cfg: &LogwatchConfig) -> Result<(), ConfigError> {
    if cfg.retention.recent_limit == 0 {
        return Err(ConfigError::invalid(
            "retention.recent_limit",
            "must be greater than zero",
        ));
    }
    if cfg.stats.window_minutes == 0 {
        return Err(ConfigError::invalid(
            "stats.window_minutes",
            "must be greater than zero",
        ));
    }
    if cfg.stats.push_interval_ms == 0 {
        return Err(ConfigError::invalid(
            "stats.push_interval_ms",
            "must be greater than zero",
        ));
    }

    match cfg.source {
        SourceKind::File => {
            if cfg.file.path.as_os_str().is_empty() {
                return Err(ConfigError::invalid(
                    "file.path",
                    "required when source = \"file\"",
                ));
            }
            if cfg.file.poll_interval_ms == 0 {
                return Err(ConfigError::invalid(
                    "file.poll_interval_ms",
                    "must be greater than zero",
                ));
            }
        }
        SourceKind::Process => {
            let p = &cfg.process;
            if p.program.trim().is_empty() {
                return Err(ConfigError::invalid("process.program", "must not be empty"));
            }
            if p.container.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "process.container",
                    "must not be empty",
                ));
            }
            if p.initial_backoff_ms == 0 {
                return Err(ConfigError::invalid(
                    "process.initial_backoff_ms",
                    "must be greater than zero",
                ));
            }
            if p.max_backoff_ms < p.initial_backoff_ms {
                return Err(ConfigError::invalid(
                    "process.max_backoff_ms",
                    format!(
                        "must be at least initial_backoff_ms ({})",
                        p.initial_backoff_ms
                    ),
                ));
            }
        }
    }

    Ok(())
}
