//! # Artifacts
//!
//! Serialized outputs of the tensor algebra engine. Artifacts are immutable
//! once returned; the orchestrator stores them verbatim and report builders
//! read them by key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Provenance carried with every artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ArtifactMeta {
    /// Coordinates the components are expressed in.
    #[serde(default)]
    pub coords: Vec<String>,
    /// Metric signature, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl ArtifactMeta {
    /// Meta for a metric with the given coordinates and signature.
    pub fn new(coords: Vec<String>, signature: impl Into<String>) -> Self {
        Self {
            coords,
            signature: Some(signature.into()),
        }
    }
}

/// A tensor serialized as nested arrays of expression strings.
///
/// `indices` encodes the index positions, one character per index: `u` for
/// an upper (contravariant) index, `d` for a lower one. The nesting depth of
/// `components` equals `indices.len()` and every level has length N.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TensorArtifact {
    /// Artifact name, e.g. `christoffel`.
    pub name: String,
    /// Index pattern, e.g. `udd`.
    pub indices: String,
    /// Nested component arrays.
    #[schema(value_type = Object)]
    pub components: Value,
    /// Provenance.
    #[serde(default)]
    pub meta: ArtifactMeta,
}

impl TensorArtifact {
    /// Tensor rank implied by the index pattern.
    pub fn rank(&self) -> usize {
        self.indices.chars().count()
    }
}

/// A single serialized expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScalarArtifact {
    /// Scalar name, e.g. `ricci_scalar`.
    pub name: String,
    /// Serialized expression.
    pub value: String,
    /// Provenance.
    #[serde(default)]
    pub meta: ArtifactMeta,
}

/// Curvature invariants keyed by name (`ricci_scalar`, `kretschmann`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InvariantsResponse {
    /// Serialized scalar expressions.
    pub scalars: BTreeMap<String, String>,
    /// Provenance.
    #[serde(default)]
    pub meta: ArtifactMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rank_follows_indices() {
        let artifact = TensorArtifact {
            name: "riemann".into(),
            indices: "uddd".into(),
            components: json!([]),
            meta: ArtifactMeta::default(),
        };
        assert_eq!(artifact.rank(), 4);
    }

    #[test]
    fn meta_omits_missing_signature() {
        let meta = ArtifactMeta {
            coords: vec!["t".into()],
            signature: None,
        };
        let encoded = serde_json::to_value(&meta).unwrap();
        assert_eq!(encoded, json!({"coords": ["t"]}));
    }

    #[test]
    fn tensor_artifact_round_trips_through_json() {
        let artifact = TensorArtifact {
            name: "ricci".into(),
            indices: "dd".into(),
            components: json!([["0", "0"], ["0", "2/r**2"]]),
            meta: ArtifactMeta::new(vec!["t".into(), "r".into()], "-+"),
        };
        let text = serde_json::to_string(&artifact).unwrap();
        let back: TensorArtifact = serde_json::from_str(&text).unwrap();
        assert_eq!(back, artifact);
    }

    #[test]
    fn artifact_without_meta_deserializes() {
        let artifact: TensorArtifact = serde_json::from_value(json!({
            "name": "g",
            "indices": "dd",
            "components": [["1"]]
        }))
        .unwrap();
        assert!(artifact.meta.coords.is_empty());
    }
}
