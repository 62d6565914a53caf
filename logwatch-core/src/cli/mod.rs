//! Subcommand implementations behind the `logwatch` binary.

pub mod config;
pub mod parse;
pub mod render;
pub mod run;

#[cfg(test)]
mod tests;
