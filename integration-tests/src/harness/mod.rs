pub mod output;
pub mod tracing;

pub use self::output::{OutputLog, collect_until, sh, wait_for_notice};
pub use self::tracing::{CapturedEvent, init_test_tracing};
