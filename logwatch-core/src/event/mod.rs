//! Parsed log events and the tab-delimited line parser.
//!
//! Every raw line becomes exactly one [`LogEvent`]. Parsing never fails: a line that
//! does not follow the `<ts>\t<LEVEL>\t<module>\t<message>` convention degrades to
//! `Level::Unknown` stamped with the ingestion time.

mod parse;
mod types;


pub use parse::{clean_line, contains_bounded_token, parse_line, parse_line_at};
pub use types::{Level, LogEvent, ParsedFields};
