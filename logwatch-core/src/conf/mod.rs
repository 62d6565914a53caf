mod error;
mod loader;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use error::ConfigError;
pub use loader::{load_config, parse_config, read_config};
pub use types::{
    FileSourceConfig, LogwatchConfig, ProcessSourceConfig, RetentionConfig, SourceKind,
    StatsConfig,
};
pub use validation::validate;
