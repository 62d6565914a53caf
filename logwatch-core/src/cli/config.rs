use crate::conf::{ConfigError, LogwatchConfig, SourceKind, load_config};
use crate::follower::LaunchPlan;
use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum ConfigCmd {
    /// Validate configuration and exit
    Check {
        /// Path to the config file
        #[arg(default_value = "logwatch.hcl")]
        path: PathBuf,
    },

    /// Print resolved configuration (YAML unless --json)
    Dump {
        #[arg(default_value = "logwatch.hcl")]
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(cmd: ConfigCmd) -> Result<()> {
    match cmd {
        ConfigCmd::Check { path } => check(path),
        ConfigCmd::Dump { path, json } => dump(path, json),
    }
}

pub fn check(path: PathBuf) -> Result<()> {
    match load_config(&path) {
        Ok(cfg) => {
            println!("✔ Config loaded successfully");
            for line in summarize(&cfg) {
                println!("✔ {line}");
            }
            Ok(())
        }
        Err(err) => {
            if let Some(hint) = config_error_hint(&err) {
                eprintln!("{hint}");
                eprintln!();
            }
            Err(err.into())
        }
    }
}

pub fn dump(path: PathBuf, json: bool) -> Result<()> {
    let cfg = load_config(&path)?;

    if json {
        dump_json(&cfg)
    } else {
        dump_yaml(&cfg)
    }
}

/// One line per effective setting group, as printed by `config check`.
pub fn summarize(cfg: &LogwatchConfig) -> Vec<String> {
    let source = match cfg.source {
        SourceKind::Process => {
            let plan = LaunchPlan::from_config(&cfg.process);
            match &plan.seed {
                Some(seed) => format!("source: process (seed `{seed}`, follow `{}`)", plan.follow),
                None => format!("source: process (follow `{}`, no seeding)", plan.follow),
            }
        }
        SourceKind::File => format!(
            "source: file {} (tail {} lines, poll every {}ms)",
            cfg.file.path.display(),
            cfg.file.tail_lines,
            cfg.file.poll_interval_ms
        ),
    };

    vec![
        source,
        format!("retention: {} recent events", cfg.retention.recent_limit),
        format!(
            "stats: {}m window, pushed every {}ms",
            cfg.stats.window_minutes, cfg.stats.push_interval_ms
        ),
    ]
}

pub fn config_error_hint(err: &ConfigError) -> Option<&'static str> {
    match err {
        ConfigError::Parse { .. } => Some(
            "Config files are HCL. Every key is optional.\n\
             \n\
             Example:\n\
             \n\
             source = \"file\"\n\
             file {\n\
             \x20 path = \"/var/log/observer.log\"\n\
             }\n\
             stats {\n\
             \x20 window_minutes = 30\n\
             }",
        ),
        ConfigError::Invalid { field: "file.path", .. } => {
            Some("A file source needs a path: set `file { path = \"...\" }` or pass --file.")
        }
        _ => None,
    }
}

fn dump_json<T: Serialize>(value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    println!("{s}");
    Ok(())
}

fn dump_yaml<T: Serialize>(value: &T) -> Result<()> {
    let s = serde_yaml::to_string(value)?;
    println!("{s}");
    Ok(())
}
