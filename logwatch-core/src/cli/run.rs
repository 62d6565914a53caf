use crate::cli::render::{Rendered, render_frame};
use crate::conf::{LogwatchConfig, SourceKind, read_config, validate};
use crate::coordinator::IngestionCoordinator;
use crate::follower::build_follower;
use crate::logging::{OutputMode, default_output_mode};
use crate::stats::redraw;
use anyhow::{Context, Result};
use clap::Args;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// HCL config file. Built-in defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Which follower to run
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Follow this file (implies --source file unless given)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Container whose logs the process follower reads
    #[arg(long)]
    pub container: Option<String>,

    /// How to render the stream (default: pretty on a terminal, json otherwise)
    #[arg(long, value_enum)]
    pub output: Option<OutputMode>,
}

pub fn run(args: RunArgs) -> Result<()> {
    let cfg = resolve_config(&args)?;
    let mode = args.output.unwrap_or_else(default_output_mode);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(run_pipeline(cfg, mode))
}

/// Config file (or defaults), then command-line overrides, then validation.
pub fn resolve_config(args: &RunArgs) -> Result<LogwatchConfig> {
    let mut cfg = match &args.config {
        Some(path) => read_config(path)?,
        None => LogwatchConfig::default(),
    };

    apply_overrides(&mut cfg, args);
    validate(&cfg)?;
    Ok(cfg)
}

pub fn apply_overrides(cfg: &mut LogwatchConfig, args: &RunArgs) {
    if let Some(path) = &args.file {
        cfg.file.path = path.clone();
        cfg.source = SourceKind::File;
    }
    if let Some(container) = &args.container {
        cfg.process.container = container.clone();
    }
    if let Some(source) = args.source {
        cfg.source = source;
    }
}

async fn run_pipeline(cfg: LogwatchConfig, mode: OutputMode) -> Result<()> {
    let follower = build_follower(&cfg);
    let coordinator = IngestionCoordinator::new(&cfg);
    let mut subscription = coordinator.subscribe();
    let (handle, task) = coordinator.spawn(follower);

    if mode == OutputMode::Stats {
        // Hide the cursor while the dashboard runs.
        print!("\x1b[?25l");
        let _ = io::stdout().flush();
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            res = &mut ctrl_c => {
                tracing::info!("interrupt received, shutting down");
                break res.context("failed to listen for ctrl-c");
            }
            frame = subscription.recv() => match frame {
                Some(frame) => {
                    if let Err(err) = emit(render_frame(mode, &frame)) {
                        break Err(err);
                    }
                }
                None => break Ok(()),
            },
            _ = handle.finished() => break Ok(()),
        }
    };

    handle.shutdown().await;
    task.await.context("ingestion task failed")?;

    if mode == OutputMode::Stats {
        print!("\x1b[?25h");
        let _ = io::stdout().flush();
    }

    result
}

fn emit(rendered: Rendered) -> Result<()> {
    match rendered {
        Rendered::Line(line) => {
            let mut out = io::stdout().lock();
            writeln!(out, "{line}").context("failed to write to stdout")?;
            out.flush().context("failed to write to stdout")?;
        }
        Rendered::Dashboard(text) => redraw(&text),
        Rendered::Nothing => {}
    }
    Ok(())
}
