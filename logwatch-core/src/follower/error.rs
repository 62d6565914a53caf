use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Recoverable follower failures. None of these stop a follower.
#[derive(Debug, Error)]
pub enum FollowerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {stream} of {program}: {source}")]
    Stream {
        program: String,
        stream: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
