//! # Capability Request/Response DTOs
//!
//! Request bodies for the capabilities that take more than a bare
//! [`MetricSpec`]. Field names and defaults are part of the wire contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::artifact::TensorArtifact;
use crate::metric::MetricSpec;

/// One numeric sample: symbol name → value.
pub type SamplePoint = BTreeMap<String, f64>;

fn default_level() -> u8 {
    1
}

fn default_unit_system() -> String {
    "SI".to_string()
}

/// Body of `check-vacuum`.
///
/// Without `sample_points` the check runs symbolically; with them it runs
/// numerically against `epsilon` (default `1e-8`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetricCheckRequest {
    /// The metric under test.
    pub metric: MetricSpec,
    /// Optional numeric sample points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_points: Option<Vec<SamplePoint>>,
    /// Optional numeric tolerance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f64>,
}

/// Body of `simplify`: either a single expression or a whole tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SimplifyRequest {
    /// Expression to simplify.
    #[serde(default)]
    pub expression: Option<String>,
    /// Tensor to simplify component-wise.
    #[serde(default)]
    pub tensor: Option<TensorArtifact>,
    /// Simplification tier, 0 to 3.
    #[serde(default = "default_level")]
    pub level: u8,
}

/// Response of `simplify` and `substitute`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SimplifyResponse {
    /// Resulting expression, when an expression was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Resulting tensor, when a tensor was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tensor: Option<TensorArtifact>,
}

/// Body of `substitute`.
///
/// Substitution values are numbers or expression strings. Keys that do not
/// occur in the target are silently unused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubstituteRequest {
    /// Expression to substitute into.
    #[serde(default)]
    pub expression: Option<String>,
    /// Tensor to substitute into component-wise.
    #[serde(default)]
    pub tensor: Option<TensorArtifact>,
    /// Symbol name → replacement.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub substitutions: BTreeMap<String, Value>,
}

/// Body of `numeric-spotcheck`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NumericSpotcheckRequest {
    /// Expression to sample.
    #[serde(default)]
    pub expression: Option<String>,
    /// Tensor to sample.
    #[serde(default)]
    pub tensor: Option<TensorArtifact>,
    /// Sample points.
    pub sample_points: Vec<SamplePoint>,
}

/// Body of `unit-check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnitCheckRequest {
    /// Expression whose dimensions are checked.
    pub expression: String,
    /// `"SI"` or `"geometrized"`.
    #[serde(default = "default_unit_system")]
    pub unit_system: String,
    /// Symbol name → unit string, e.g. `"m/s**2"`.
    #[serde(default)]
    pub symbol_units: BTreeMap<String, String>,
}
