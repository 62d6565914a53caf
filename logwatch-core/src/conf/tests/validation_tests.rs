use crate::conf::{ConfigError, LogwatchConfig, SourceKind, validate};

fn invalid_field(cfg: &LogwatchConfig) -> &'static str {
    match validate(cfg) {
        Err(ConfigError::Invalid { field, .. }) => field,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn defaults_are_valid() {
    assert!(validate(&LogwatchConfig::default()).is_ok());
}

#[test]
fn zero_sizes_are_rejected() {
    let mut cfg = LogwatchConfig::default();
    cfg.retention.recent_limit = 0;
    assert_eq!(invalid_field(&cfg), "retention.recent_limit");

    let mut cfg = LogwatchConfig::default();
    cfg.stats.window_minutes = 0;
    assert_eq!(invalid_field(&cfg), "stats.window_minutes");

    let mut cfg = LogwatchConfig::default();
    cfg.stats.push_interval_ms = 0;
    assert_eq!(invalid_field(&cfg), "stats.push_interval_ms");
}

#[test]
fn only_the_selected_source_is_checked() {
    let mut cfg = LogwatchConfig::default();
    cfg.process.container = String::new();
    cfg.source = SourceKind::File;
    cfg.file.path = "/tmp/app.log".into();

    assert!(validate(&cfg).is_ok());

    cfg.source = SourceKind::Process;
    assert_eq!(invalid_field(&cfg), "process.container");
}

#[test]
fn backoff_cap_must_cover_initial_delay() {
    let mut cfg = LogwatchConfig::default();
    cfg.process.initial_backoff_ms = 5_000;
    cfg.process.max_backoff_ms = 1_000;

    assert_eq!(invalid_field(&cfg), "process.max_backoff_ms");
}

#[test]
fn file_poll_interval_must_be_positive() {
    let mut cfg = LogwatchConfig::default();
    cfg.source = SourceKind::File;
    cfg.file.path = "/tmp/app.log".into();
    cfg.file.poll_interval_ms = 0;

    assert_eq!(invalid_field(&cfg), "file.poll_interval_ms");
}
