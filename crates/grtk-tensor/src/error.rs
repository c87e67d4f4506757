//! # Error Types
//!
//! Failures of the metric parser and the tensor algebra engine. Shape
//! errors pass through unchanged from `grtk-core`; everything else is a
//! symbolic failure that callers report as a failed node or check.

use grtk_cas::CasError;
use grtk_core::SpecError;
use thiserror::Error;

/// Failure while parsing a metric or computing a tensor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    /// The metric spec has an impossible shape.
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// A metric cell is not a valid expression.
    #[error("invalid metric cell ({row}, {col}): {source}")]
    InvalidCell {
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        col: usize,
        /// Why the cell was rejected.
        source: CasError,
    },

    /// The metric has no inverse.
    #[error("metric is singular")]
    SingularMetric,

    /// A tensor artifact does not have the shape its indices declare.
    #[error("invalid tensor artifact: {0}")]
    InvalidArtifact(String),

    /// A symbolic operation failed.
    #[error("symbolic computation failed: {0}")]
    Symbolic(#[from] CasError),
}
