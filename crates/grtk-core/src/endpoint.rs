//! # Capability Endpoints
//!
//! One identifier per stateless capability. The HTTP boundary mounts each
//! endpoint at [`Endpoint::path`]; the in-process dispatcher and plan steps
//! refer to capabilities by the same path so a plan runs unchanged against
//! either. Dataset records name them by [`Endpoint::tool_name`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A capability exposed by the toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    MetricValidate,
    Christoffel,
    Riemann,
    Ricci,
    RicciScalar,
    EinsteinTensor,
    Invariants,
    CheckMetricSymmetry,
    CheckChristoffelSymmetry,
    CheckRiemannSymmetries,
    CheckContractedBianchi,
    CheckVacuum,
    Simplify,
    Substitute,
    NumericSpotcheck,
    UnitCheck,
}

const ALL: [Endpoint; 16] = [
    Endpoint::MetricValidate,
    Endpoint::Christoffel,
    Endpoint::Riemann,
    Endpoint::Ricci,
    Endpoint::RicciScalar,
    Endpoint::EinsteinTensor,
    Endpoint::Invariants,
    Endpoint::CheckMetricSymmetry,
    Endpoint::CheckChristoffelSymmetry,
    Endpoint::CheckRiemannSymmetries,
    Endpoint::CheckContractedBianchi,
    Endpoint::CheckVacuum,
    Endpoint::Simplify,
    Endpoint::Substitute,
    Endpoint::NumericSpotcheck,
    Endpoint::UnitCheck,
];

impl Endpoint {
    /// Every endpoint, in declaration order.
    pub fn all() -> &'static [Endpoint] {
        &ALL
    }

    /// Kebab-case slug, e.g. `ricci-scalar`.
    pub fn slug(self) -> &'static str {
        match self {
            Self::MetricValidate => "metric-validate",
            Self::Christoffel => "christoffel",
            Self::Riemann => "riemann",
            Self::Ricci => "ricci",
            Self::RicciScalar => "ricci-scalar",
            Self::EinsteinTensor => "einstein-tensor",
            Self::Invariants => "invariants",
            Self::CheckMetricSymmetry => "check-metric-symmetry",
            Self::CheckChristoffelSymmetry => "check-christoffel-symmetry",
            Self::CheckRiemannSymmetries => "check-riemann-symmetries",
            Self::CheckContractedBianchi => "check-contracted-bianchi",
            Self::CheckVacuum => "check-vacuum",
            Self::Simplify => "simplify",
            Self::Substitute => "substitute",
            Self::NumericSpotcheck => "numeric-spotcheck",
            Self::UnitCheck => "unit-check",
        }
    }

    /// HTTP path, e.g. `/physics/ricci-scalar`.
    pub fn path(self) -> String {
        format!("/physics/{}", self.slug())
    }

    /// Dataset tool name, e.g. `physics.ricci-scalar`.
    pub fn tool_name(self) -> String {
        format!("physics.{}", self.slug())
    }

    /// Resolve an HTTP path (with or without a trailing slash).
    pub fn from_path(path: &str) -> Option<Self> {
        let slug = path.trim_end_matches('/').strip_prefix("/physics/")?;
        ALL.iter().copied().find(|endpoint| endpoint.slug() == slug)
    }

    /// Whether the capability consumes a bare `MetricSpec`.
    pub fn takes_metric(self) -> bool {
        !matches!(
            self,
            Self::CheckVacuum
                | Self::Simplify
                | Self::Substitute
                | Self::NumericSpotcheck
                | Self::UnitCheck
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_round_trip() {
        for &endpoint in Endpoint::all() {
            assert_eq!(Endpoint::from_path(&endpoint.path()), Some(endpoint));
        }
    }

    #[test]
    fn trailing_slash_accepted() {
        assert_eq!(
            Endpoint::from_path("/physics/christoffel/"),
            Some(Endpoint::Christoffel)
        );
    }

    #[test]
    fn unknown_paths_rejected() {
        assert_eq!(Endpoint::from_path("/physics/unknown"), None);
        assert_eq!(Endpoint::from_path("/christoffel"), None);
    }

    #[test]
    fn tool_names_use_dotted_prefix() {
        assert_eq!(Endpoint::EinsteinTensor.tool_name(), "physics.einstein-tensor");
    }

    #[test]
    fn serde_uses_kebab_case() {
        let encoded = serde_json::to_string(&Endpoint::CheckVacuum).unwrap();
        assert_eq!(encoded, "\"check-vacuum\"");
    }

    #[test]
    fn metric_consumers() {
        assert!(Endpoint::Riemann.takes_metric());
        assert!(!Endpoint::CheckVacuum.takes_metric());
        assert!(!Endpoint::UnitCheck.takes_metric());
    }
}
