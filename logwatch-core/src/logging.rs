use clap::ValueEnum;
use std::io::{self, IsTerminal};
use tracing_subscriber::{EnvFilter, fmt};

/// Install JSON diagnostics on stderr, filtered by `RUST_LOG` (default `info`).
///
/// Stdout is left to the event stream, so diagnostics never interleave with it.
pub fn init_normal_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .json()
        .flatten_event(true)
        .init();
}

pub fn init_logging() {
    // tokio-console brings its own subscriber; installing ours as well would fail.
    if std::env::var("TOKIO_CONSOLE").is_ok() {
        init_console_logging();
    } else {
        init_normal_logging();
    }
}

fn init_console_logging() {
    console_subscriber::init();
}

pub fn default_output_mode() -> OutputMode {
    if io::stdout().is_terminal() {
        OutputMode::Pretty
    } else {
        OutputMode::Json
    }
}

/// How `logwatch run` renders the real-time stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// One envelope per line, verbatim.
    Json,
    Pretty,
    /// Redrawn dashboard on every stats push.
    Stats,
}
