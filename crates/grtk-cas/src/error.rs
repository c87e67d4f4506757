//! # Error Types
//!
//! Symbolic failures ([`CasError`]) are raised by parsing, normalization and
//! inversion. Numeric failures ([`EvalError`]) are raised only by
//! evaluation to `f64`, so callers can skip a failing sample without
//! treating it as a symbolic error.

use thiserror::Error;

/// Failure of a symbolic operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CasError {
    /// The input text is not a valid expression.
    #[error("parse error at position {position}: {message}")]
    Parse {
        /// Zero-based character offset.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// A denominator reduced to zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A matrix has no inverse.
    #[error("matrix is singular")]
    SingularMatrix,

    /// A construct outside the supported algebra.
    #[error("unsupported expression: {0}")]
    Unsupported(String),

    /// An operation would produce an unreasonably large result.
    #[error("expression too large: {0}")]
    TooLarge(String),
}

impl CasError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }
}

/// Failure of numeric evaluation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A symbol has no value in the environment.
    #[error("unbound symbol '{0}'")]
    Unbound(String),

    /// A function or construct has no numeric meaning here.
    #[error("cannot evaluate numerically: {0}")]
    Unsupported(String),

    /// The result is infinite or NaN.
    #[error("non-finite value")]
    NonFinite,
}
