use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Invalid cache geometry: {0}")]
    GeometryError(#[from] GeometryError),

    #[error("Malformed trace: {0}")]
    TraceError(#[from] TraceError),

    #[error("Failed to open trace file '{0}': {1}")]
    TraceOpenError(PathBuf, #[source] std::io::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Failed to parse config: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

/// Errors raised while validating a cache geometry.
/// All of them are detected at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("{field} must be a positive power of two, got {value}")]
    NotPowerOfTwo { field: &'static str, value: usize },

    #[error(
        "block size {block_size} x associativity {associativity} does not divide total size {total_size}"
    )]
    IndivisibleSize {
        total_size: usize,
        block_size: usize,
        associativity: usize,
    },

    #[error(
        "total size {total_size} holds no full set of {associativity} blocks of {block_size} bytes"
    )]
    NoSets {
        total_size: usize,
        block_size: usize,
        associativity: usize,
    },
}

/// Errors related to reading trace records
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("line {line}: unknown access kind {kind}, expected 0, 1 or 2")]
    UnknownKind { line: usize, kind: u8 },

    #[error("line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
