//! # Check Results
//!
//! The single value type every check produces. A `CheckResult` is built
//! once and never mutated afterwards; the builder methods consume `self`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of one structural or numeric check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CheckResult {
    /// Stable check identifier, e.g. `vacuum`.
    pub check_name: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Diagnostic residual (a failing expression, a measured maximum).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual: Option<String>,
    /// Free-form explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CheckResult {
    /// A passing result with no diagnostics.
    pub fn pass(check_name: impl Into<String>) -> Self {
        Self {
            check_name: check_name.into(),
            passed: true,
            residual: None,
            notes: None,
        }
    }

    /// A failing result with no diagnostics.
    pub fn fail(check_name: impl Into<String>) -> Self {
        Self {
            check_name: check_name.into(),
            passed: false,
            residual: None,
            notes: None,
        }
    }

    /// A result whose verdict is decided by `passed`.
    pub fn verdict(check_name: impl Into<String>, passed: bool) -> Self {
        if passed {
            Self::pass(check_name)
        } else {
            Self::fail(check_name)
        }
    }

    /// Attach a residual.
    pub fn with_residual(mut self, residual: impl Into<String>) -> Self {
        self.residual = Some(residual.into());
        self
    }

    /// Attach notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Envelope for capabilities that return several checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CheckResultsResponse {
    /// The individual results, in evaluation order.
    pub checks: Vec<CheckResult>,
}
