//! Error types for actiseg

use thiserror::Error;

/// Errors that can occur during segmentation
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Epoch series too short for epoch-rate detection ({0} epochs)")]
    SeriesTooShort(usize),

    #[error("Epoch series columns have mismatched lengths: {0}")]
    ColumnLengthMismatch(String),

    #[error("Timestamps are not strictly increasing at epoch {0}")]
    NonMonotonicTimestamps(usize),

    #[error("Failed to parse timestamp: {0}")]
    TimestampParse(String),

    #[error("Non-positive inferred epoch duration ({0} seconds)")]
    InvalidEpochDuration(i64),

    #[error("Epoch duration of {0} seconds does not divide one minute")]
    NonDivisorEpochDuration(i64),

    #[error("Shift table has no usable id column")]
    MissingIdColumn,

    #[error("Subject '{id}' matched {count} rows in shift table, expected 1")]
    SubjectLookup { id: String, count: usize },

    #[error("Unable to auto-detect shift table layout")]
    FormatUndetected,

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid window bounds [{start}, {end})")]
    InvalidWindow { start: usize, end: usize },
}
