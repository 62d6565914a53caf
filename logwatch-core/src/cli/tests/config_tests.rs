use crate::cli::config::{config_error_hint, summarize};
use crate::conf::{ConfigError, LogwatchConfig, SourceKind};
use pretty_assertions::assert_eq;

#[test]
fn summary_describes_process_commands() {
    let cfg = LogwatchConfig::default();

    let lines = summarize(&cfg);

    assert_eq!(
        lines,
        vec![
            "source: process (seed `docker logs --since=1h fdc-observer`, follow `docker logs -f --tail=0 fdc-observer`)".to_string(),
            "retention: 5000 recent events".to_string(),
            "stats: 60m window, pushed every 5000ms".to_string(),
        ]
    );
}

#[test]
fn summary_describes_file_source() {
    let mut cfg = LogwatchConfig::default();
    cfg.source = SourceKind::File;
    cfg.file.path = "/var/log/observer.log".into();

    let lines = summarize(&cfg);

    assert_eq!(
        lines[0],
        "source: file /var/log/observer.log (tail 2000 lines, poll every 250ms)"
    );
}

#[test]
fn missing_file_path_has_a_hint() {
    let err = ConfigError::Invalid {
        field: "file.path",
        reason: "required".to_string(),
    };

    assert!(config_error_hint(&err).is_some_and(|h| h.contains("--file")));
}
