// src/error.rs
use std::path::PathBuf;

/// Fatal problems found while turning options into a runnable query.
/// Nothing is scanned once one of these is raised.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid where clause; use varname=value: {0}")]
    InvalidWhere(String),

    #[error("You must supply a variable name in --where")]
    MissingWhereVariable,

    #[error("No support yet for --pid {0}")]
    UnsupportedPidEndpoint(String),

    #[error("Cannot read pid file {path}: {source}")]
    PidFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown driver: {0}")]
    UnknownDriver(String),

    #[error("Duplicate driver name: {0}")]
    DuplicateDriver(String),

    #[error("Invalid driver file {path}: {message}")]
    DriverFile { path: PathBuf, message: String },

    #[error("Invalid pattern in fragment for {keys:?}: {source}")]
    FragmentPattern {
        keys: Vec<String>,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to compile log line pattern: {0}")]
    Composite(#[from] regex::Error),
}

/// Errors that abort a scan part way through.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}
