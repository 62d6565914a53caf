//! Rolling per-minute warning/error/critical counters.
//!
//! Events are folded into calendar-minute buckets keyed by `floor(ts / 60000)`. Eviction is
//! always relative to a caller-supplied instant (the event's own timestamp on `add`, the query
//! time on `snapshot`), never the wall clock, so backfilled history ages out against its own era.

mod aggregation;
mod render;


pub use aggregation::{LevelCounts, StatsAggregator, StatsBucket, StatsSnapshot};
pub use render::{redraw, render_stats};
