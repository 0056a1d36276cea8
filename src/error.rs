//! Error types for battery-soh
//!
//! Skipped cycles and rejected health groups are reported as outcomes, not
//! errors. Only failures that stop a unit of work (or the whole run) land here.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// battery-soh error types
#[derive(Error, Debug)]
pub enum Error {
    /// A raw cycle lacks a container the extractor cannot do without
    #[error("Missing mandatory field '{0}' in cycle")]
    MissingMandatoryField(String),

    /// A raw cycle declares a type outside charge/discharge/impedance
    #[error("Unknown cycle type: '{0}'")]
    UnknownCycleType(String),

    /// The raw corpus directory does not exist (fatal for the run)
    #[error("Corpus source not found: {}\nCheck --raw-dir or the raw_dir config entry", .0.display())]
    CorpusSourceMissing(PathBuf),

    /// The fixed-width cycle identifier space is used up
    #[error("Cycle identifier space exhausted: {0} exceeds the 5-digit table names")]
    IdentifierExhausted(u32),

    /// A per-cycle table lacks a column the health stage reads
    #[error("Missing column '{column}' in {}", .file.display())]
    MissingColumn {
        /// Column name that was looked up
        column: String,
        /// Table artifact that was read
        file: PathBuf,
    },

    /// A per-cycle table cell is neither empty nor numeric
    #[error("Invalid cell '{value}' in column '{column}' at row {row}")]
    InvalidCell {
        /// Column name
        column: String,
        /// Zero-based data row
        row: usize,
        /// Raw cell text
        value: String,
    },

    /// Columns of one discharge series differ in length
    #[error("Series length mismatch: '{column}' has {found} samples, expected {expected}")]
    SeriesLengthMismatch {
        /// Column whose length differs from the voltage column
        column: String,
        /// Voltage column length
        expected: usize,
        /// Offending column length
        found: usize,
    },

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Storage error (Parquet/Arrow sink)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encode/decode error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}
