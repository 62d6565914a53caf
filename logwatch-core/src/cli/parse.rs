use crate::event::parse_line;
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

/// Parse stdin line by line and print each event as one JSON line.
pub fn run_parse() -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let parsed = parse_stream(stdin.lock(), stdout.lock())?;
    tracing::debug!(lines = parsed, "parse finished");
    Ok(())
}

/// Blank lines are skipped, undecodable bytes replaced. Returns how many events were written.
pub fn parse_stream<R: BufRead, W: Write>(mut reader: R, mut out: W) -> Result<usize> {
    let mut buf = Vec::new();
    let mut written = 0;

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .context("failed to read input")?;
        if n == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }

        let json = serde_json::to_string(&parse_line(&line))?;
        writeln!(out, "{json}").context("failed to write output")?;
        written += 1;
    }

    out.flush().context("failed to write output")?;
    Ok(written)
}
