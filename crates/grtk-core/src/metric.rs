//! # Metric Specification
//!
//! The request shape shared by every metric-consuming capability:
//!
//! ```json
//! {"coords": ["t", "r"], "g_dd": [["-(1-2*M/r)", 0], [0, "1/(1-2*M/r)"]],
//!  "assumptions": {"r": {"positive": true}}, "signature": "-+++"}
//! ```
//!
//! Matrix cells are expression strings or JSON numbers. The shape (N
//! distinct coordinate identifiers, an N×N matrix) is validated here;
//! symmetry is deliberately not enforced, it is checked downstream.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::SpecError;

/// Signature used when the request omits one.
pub const DEFAULT_SIGNATURE: &str = "-+++";

/// Per-symbol assumption flags, e.g. `{"r": {"positive": true}}`.
pub type Assumptions = BTreeMap<String, BTreeMap<String, bool>>;

fn default_signature() -> String {
    DEFAULT_SIGNATURE.to_string()
}

/// A metric given as coordinates plus a matrix of expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetricSpec {
    /// Ordered coordinate names.
    pub coords: Vec<String>,
    /// Covariant metric components, one row per coordinate.
    #[schema(value_type = Vec<Vec<Object>>)]
    pub g_dd: Vec<Vec<Value>>,
    /// Assumption overrides keyed by symbol name.
    #[serde(default)]
    pub assumptions: Assumptions,
    /// Metric signature, e.g. `-+++`.
    #[serde(default = "default_signature")]
    pub signature: String,
}

impl MetricSpec {
    /// Build a spec with no assumptions and the default signature.
    pub fn new(coords: Vec<String>, g_dd: Vec<Vec<Value>>) -> Self {
        Self {
            coords,
            g_dd,
            assumptions: Assumptions::new(),
            signature: default_signature(),
        }
    }

    /// Number of coordinates.
    pub fn dimension(&self) -> usize {
        self.coords.len()
    }

    /// Reject shapes that make computation impossible.
    ///
    /// Checks, in order: non-empty coordinates, identifier syntax, distinct
    /// names, row count, row lengths.
    pub fn validate(&self) -> Result<(), SpecError> {
        let size = self.coords.len();
        if size == 0 {
            return Err(SpecError::EmptyCoordinates);
        }
        let mut seen = BTreeSet::new();
        for name in &self.coords {
            if !is_identifier(name) {
                return Err(SpecError::InvalidCoordinateName(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(SpecError::DuplicateCoordinate(name.clone()));
            }
        }
        if self.g_dd.len() != size {
            return Err(SpecError::RowCountMismatch {
                expected: size,
                found: self.g_dd.len(),
            });
        }
        for (row, entries) in self.g_dd.iter().enumerate() {
            if entries.len() != size {
                return Err(SpecError::NotSquare {
                    row,
                    expected: size,
                    found: entries.len(),
                });
            }
        }
        Ok(())
    }

    /// The textual form of cell `(row, col)`.
    ///
    /// Strings are returned as-is, numbers in their JSON spelling. Any other
    /// JSON value (or an out-of-range index) yields `None`.
    pub fn cell_text(&self, row: usize, col: usize) -> Option<String> {
        match self.g_dd.get(row)?.get(col)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
