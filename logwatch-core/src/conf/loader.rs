use crate::conf::error::ConfigError;
use crate::conf::types::LogwatchConfig;
use crate::conf::validation::validate;
use std::fs;
use std::path::Path;

/// Read, parse and validate an HCL config file.
pub fn load_config(path: &Path) -> Result<LogwatchConfig, ConfigError> {
    let cfg = read_config(path)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Read and parse without validating, for callers that still apply overrides.
pub fn read_config(path: &Path) -> Result<LogwatchConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    parse_config(path, &contents)
}

/// Parse HCL text; `origin` is only used for error reporting.
pub fn parse_config(origin: &Path, contents: &str) -> Result<LogwatchConfig, ConfigError> {
    hcl::from_str(contents).map_err(|e| ConfigError::parse(origin, e))
}
