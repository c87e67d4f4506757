//! # Error Types

use grtk_cas::CasError;
use thiserror::Error;

/// Why an expression failed dimensional analysis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    /// A symbol in the expression has no declared unit.
    #[error("missing unit for symbol '{0}'")]
    MissingUnit(String),

    /// A unit string names a unit outside the SI table.
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    /// Terms of a sum have different dimensions.
    #[error("unit mismatch in sum")]
    Mismatch,

    /// A power whose exponent is not a number.
    #[error("non-numeric exponent in unit expression")]
    NonNumericExponent,

    /// A function applied to a dimensionful quantity.
    #[error("function expects dimensionless argument")]
    DimensionfulArgument,

    /// A dimension exponent does not fit in 64-bit rationals.
    #[error("dimension exponent out of range")]
    ExponentOverflow,

    /// A construct the checker cannot assign a dimension to.
    #[error("unsupported expression for unit check")]
    Unsupported,

    /// The expression or a unit string does not parse.
    #[error("invalid expression: {0}")]
    Parse(#[from] CasError),
}
