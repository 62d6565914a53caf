use super::aggregation::StatsSnapshot;
use chrono::DateTime;
use std::io;
use std::io::Write;

const BAR_WIDTH: u64 = 30;

pub fn render_stats(snapshot: &StatsSnapshot) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Logwatch Stats ({}m window)\n\
         ===========================\n\
         WARNING: {} | ERROR: {} | CRITICAL: {}\n",
        snapshot.window_minutes,
        snapshot.totals.warning,
        snapshot.totals.error,
        snapshot.totals.critical
    ));

    match (snapshot.last_round, snapshot.seconds_since_last_round) {
        (Some(round), Some(age)) => {
            out.push_str(&format!("Last round: {round} ({age}s ago)\n\n"));
        }
        _ => out.push_str("Last round: <none seen>\n\n"),
    }

    let peak = snapshot
        .buckets
        .iter()
        .map(|b| b.counts.total())
        .max()
        .unwrap_or(0);

    if peak == 0 {
        out.push_str("Per minute: <no warnings or errors>\n");
        return out;
    }

    out.push_str("Per minute (W/E/C):\n");
    for bucket in &snapshot.buckets {
        let label = DateTime::from_timestamp(bucket.minute * 60, 0)
            .map(|dt| dt.format("%H:%M").to_string())
            .unwrap_or_else(|| bucket.minute.to_string());
        let total = bucket.counts.total();
        let bars = (total * BAR_WIDTH).div_ceil(peak) as usize;

        out.push_str(&format!(
            "  {label} {:<30} {}/{}/{}\n",
            "█".repeat(bars),
            bucket.counts.warning,
            bucket.counts.error,
            bucket.counts.critical
        ));
    }

    out
}

pub fn redraw(output: &str) {
    print!("\x1b[2J\x1b[H");
    println!("{output}");
    let _ = io::stdout().flush();
}
