use crate::conf::{
    ConfigError, LogwatchConfig, SourceKind, load_config, parse_config, read_config,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

#[test]
fn empty_file_yields_defaults() {
    let cfg = parse_config(Path::new("empty.hcl"), "").unwrap();

    assert_eq!(cfg, LogwatchConfig::default());
    assert_eq!(cfg.source, SourceKind::Process);
    assert_eq!(cfg.retention.recent_limit, 5_000);
    assert_eq!(cfg.stats.window_minutes, 60);
    assert_eq!(cfg.stats.push_interval_ms, 5_000);
    assert_eq!(cfg.process.since, "1h");
    assert_eq!(cfg.file.tail_lines, 2_000);
}

#[test]
fn file_source_with_overrides() {
    // Arrange
    let dir = tempdir().unwrap();
    let path = dir.path().join("logwatch.hcl");
    fs::write(
        &path,
        r#"
source = "file"

file {
  path             = "/var/log/observer.log"
  tail_lines       = 50
  poll_interval_ms = 100
}

retention {
  recent_limit = 10
}

stats {
  window_minutes = 15
}
"#,
    )
    .unwrap();

    // Act
    let cfg = load_config(&path).unwrap();

    // Assert
    assert_eq!(cfg.source, SourceKind::File);
    assert_eq!(cfg.file.path, PathBuf::from("/var/log/observer.log"));
    assert_eq!(cfg.file.tail_lines, 50);
    assert_eq!(cfg.file.poll_interval_ms, 100);
    assert_eq!(cfg.retention.recent_limit, 10);
    assert_eq!(cfg.stats.window_minutes, 15);
    assert_eq!(cfg.stats.push_interval_ms, 5_000);
}

#[test]
fn process_block_is_parsed() {
    let cfg = parse_config(
        Path::new("inline.hcl"),
        r#"
process {
  container = "observer-1"
  use_sudo  = true
  since     = "30m"
}
"#,
    )
    .unwrap();

    assert_eq!(cfg.process.container, "observer-1");
    assert!(cfg.process.use_sudo);
    assert_eq!(cfg.process.since, "30m");
    assert_eq!(cfg.process.program, "docker");
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempdir().unwrap();

    let err = load_config(&dir.path().join("nope.hcl")).unwrap_err();

    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = parse_config(Path::new("bad.hcl"), "colour = \"blue\"\n").unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn invalid_values_fail_validation_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("logwatch.hcl");
    fs::write(&path, "source = \"file\"\n").unwrap();

    let err = load_config(&path).unwrap_err();

    assert!(matches!(
        err,
        ConfigError::Invalid {
            field: "file.path",
            ..
        }
    ));
}

#[test]
fn read_config_skips_validation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("logwatch.hcl");
    fs::write(&path, "source = \"file\"\n").unwrap();

    let cfg = read_config(&path).unwrap();

    assert_eq!(cfg.source, SourceKind::File);
    assert!(cfg.file.path.as_os_str().is_empty());
}
