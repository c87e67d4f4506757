//! # Error Types
//!
//! Shape errors are the only failures the toolkit surfaces as hard
//! rejections: they are detected before any symbolic work begins. All
//! later failures (unparsable cells, singular metrics, numeric sampling)
//! are reported as failed nodes or failed checks by the crates above.

use thiserror::Error;

/// A `MetricSpec` whose shape makes computation impossible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// The coordinate list is empty.
    #[error("coords must be non-empty")]
    EmptyCoordinates,

    /// The same coordinate name appears twice.
    #[error("duplicate coordinate name '{0}'")]
    DuplicateCoordinate(String),

    /// A coordinate name is not a valid identifier.
    #[error("invalid coordinate name '{0}': expected an identifier")]
    InvalidCoordinateName(String),

    /// `g_dd` has a different number of rows than there are coordinates.
    #[error("g_dd must match coords length: expected {expected} rows, found {found}")]
    RowCountMismatch {
        /// Number of coordinates.
        expected: usize,
        /// Number of rows supplied.
        found: usize,
    },

    /// A row of `g_dd` has the wrong number of entries.
    #[error("g_dd must be a square matrix: row {row} has {found} entries, expected {expected}")]
    NotSquare {
        /// Zero-based row index.
        row: usize,
        /// Number of coordinates.
        expected: usize,
        /// Number of entries in the row.
        found: usize,
    },
}

/// Failure while reading or writing line-delimited fixture records.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// IO error on the dataset file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line could not be decoded as a fixture record.
    #[error("line {line}: {source}")]
    Json {
        /// One-based line number.
        line: usize,
        /// Underlying decode error.
        source: serde_json::Error,
    },

    /// A record could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
