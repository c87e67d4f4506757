//! # Metric Parser
//!
//! Turns a validated [`MetricSpec`] into a [`ParsedMetric`]: one
//! [`CoordinateSymbol`] per coordinate and a symbolic metric matrix whose
//! cells are in rational-function normal form.
//!
//! ## Assumptions
//!
//! Every coordinate starts from the defaults (`real: true`) and then takes
//! the caller's overrides for its name. Overrides naming symbols that are
//! not coordinates (parameters such as `M`) are kept in
//! [`ParsedMetric::parameter_assumptions`] instead of being discarded.
//! Every symbol flagged `positive: true`, coordinate or parameter, may have
//! its powers taken out of roots while cells are parsed.

use std::collections::BTreeMap;

use grtk_cas::{CasError, Positivity, RatFunc, SymMatrix};
use grtk_core::{ArtifactMeta, Assumptions, MetricSpec};
use tracing::debug;

use crate::error::TensorError;

/// A coordinate name with its resolved assumption flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateSymbol {
    pub name: String,
    pub assumptions: BTreeMap<String, bool>,
}

impl CoordinateSymbol {
    /// Whether `flag` is set to `true`.
    pub fn assumes(&self, flag: &str) -> bool {
        self.assumptions.get(flag).copied().unwrap_or(false)
    }
}

/// Layers caller overrides on top of default assumption flags.
#[derive(Debug, Clone)]
pub struct AssumptionBuilder {
    defaults: BTreeMap<String, bool>,
    overrides: Assumptions,
}

impl AssumptionBuilder {
    /// Builder with the coordinate defaults (`real: true`).
    pub fn new(overrides: &Assumptions) -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert("real".to_string(), true);
        Self {
            defaults,
            overrides: overrides.clone(),
        }
    }

    /// Replace or add a default flag.
    pub fn with_default(mut self, flag: impl Into<String>, value: bool) -> Self {
        self.defaults.insert(flag.into(), value);
        self
    }

    /// Defaults for `name`, then the overrides given for it.
    pub fn build(&self, name: &str) -> CoordinateSymbol {
        let mut assumptions = self.defaults.clone();
        if let Some(overrides) = self.overrides.get(name) {
            assumptions.extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
        }
        CoordinateSymbol {
            name: name.to_string(),
            assumptions,
        }
    }

    /// Names among `coords` and the overridden parameters whose resolved
    /// `positive` flag is set.
    pub fn positivity(&self, coords: &[String]) -> Positivity {
        let mut positive = Positivity::none();
        for name in coords.iter().chain(self.overrides.keys()) {
            if self.build(name).assumes("positive") {
                positive.insert(name.clone());
            }
        }
        positive
    }

    /// Overrides for names outside `coords`.
    pub fn parameter_assumptions(&self, coords: &[String]) -> Assumptions {
        self.overrides
            .iter()
            .filter(|(name, _)| !coords.contains(name))
            .map(|(name, flags)| (name.clone(), flags.clone()))
            .collect()
    }
}

/// A metric ready for tensor computation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMetric {
    pub coords: Vec<CoordinateSymbol>,
    pub coord_index: BTreeMap<String, usize>,
    pub parameter_assumptions: Assumptions,
    pub positive: Positivity,
    pub g_dd: SymMatrix,
    pub signature: String,
}

impl ParsedMetric {
    pub fn dimension(&self) -> usize {
        self.coords.len()
    }

    /// Name of coordinate `i`.
    pub fn coord(&self, i: usize) -> &str {
        &self.coords[i].name
    }

    pub fn coord_names(&self) -> Vec<String> {
        self.coords.iter().map(|c| c.name.clone()).collect()
    }

    /// Provenance attached to artifacts derived from this metric.
    pub fn meta(&self) -> ArtifactMeta {
        ArtifactMeta::new(self.coord_names(), self.signature.clone())
    }
}

/// Validate the shape of `spec` and parse every cell.
pub fn parse_metric(spec: &MetricSpec) -> Result<ParsedMetric, TensorError> {
    spec.validate()?;
    let builder = AssumptionBuilder::new(&spec.assumptions);
    let coords: Vec<CoordinateSymbol> = spec.coords.iter().map(|name| builder.build(name)).collect();
    let coord_index = spec
        .coords
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect();

    let positive = builder.positivity(&spec.coords);
    let size = spec.dimension();
    let mut g_dd = SymMatrix::new(size);
    for row in 0..size {
        for col in 0..size {
            g_dd.set(row, col, parse_cell(spec, row, col, &positive)?);
        }
    }
    debug!(dimension = size, signature = %spec.signature, "parsed metric");

    Ok(ParsedMetric {
        coords,
        coord_index,
        parameter_assumptions: builder.parameter_assumptions(&spec.coords),
        positive,
        g_dd,
        signature: spec.signature.clone(),
    })
}

fn parse_cell(
    spec: &MetricSpec,
    row: usize,
    col: usize,
    positive: &Positivity,
) -> Result<RatFunc, TensorError> {
    let invalid = |source: CasError| TensorError::InvalidCell { row, col, source };
    let text = spec.cell_text(row, col).ok_or_else(|| {
        invalid(CasError::Unsupported(
            "cell must be an expression string or a number".to_string(),
        ))
    })?;
    RatFunc::parse_in(&text, positive).map_err(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grtk_core::SpecError;
    use serde_json::json;

    fn schwarzschild() -> MetricSpec {
        let mut spec = MetricSpec::new(
            vec!["t".into(), "r".into(), "theta".into(), "phi".into()],
            vec![
                vec![json!("-(1 - 2*M/r)"), json!(0), json!(0), json!(0)],
                vec![json!(0), json!("1/(1 - 2*M/r)"), json!(0), json!(0)],
                vec![json!(0), json!(0), json!("r**2"), json!(0)],
                vec![json!(0), json!(0), json!(0), json!("r**2*sin(theta)**2")],
            ],
        );
        spec.assumptions
            .insert("r".into(), [("positive".to_string(), true)].into_iter().collect());
        spec.assumptions
            .insert("M".into(), [("positive".to_string(), true)].into_iter().collect());
        spec
    }

    #[test]
    fn parses_schwarzschild() {
        let parsed = parse_metric(&schwarzschild()).unwrap();
        assert_eq!(parsed.dimension(), 4);
        assert_eq!(parsed.coord_index["theta"], 2);
        assert_eq!(parsed.g_dd.get(2, 2), &RatFunc::parse("r**2").unwrap());
        assert!(parsed.g_dd.get(0, 1).is_zero());
    }

    #[test]
    fn coordinates_default_to_real_and_take_overrides() {
        let parsed = parse_metric(&schwarzschild()).unwrap();
        let r = &parsed.coords[1];
        assert!(r.assumes("real"));
        assert!(r.assumes("positive"));
        assert!(parsed.coords[0].assumes("real"));
        assert!(!parsed.coords[0].assumes("positive"));
    }

    #[test]
    fn parameter_assumptions_are_kept() {
        let parsed = parse_metric(&schwarzschild()).unwrap();
        assert!(parsed.parameter_assumptions.contains_key("M"));
        assert!(!parsed.parameter_assumptions.contains_key("r"));
    }

    #[test]
    fn positive_symbols_leave_roots() {
        let mut spec = MetricSpec::new(
            vec!["r".into(), "x".into()],
            vec![
                vec![json!("sqrt(r**2)"), json!(0)],
                vec![json!(0), json!("sqrt(x**2)*sqrt(M**2)")],
            ],
        );
        let positive = |name: &str| -> (String, BTreeMap<String, bool>) {
            (name.to_string(), [("positive".to_string(), true)].into_iter().collect())
        };
        spec.assumptions.extend([positive("r"), positive("M")]);
        let parsed = parse_metric(&spec).unwrap();
        assert!(parsed.positive.contains("r") && parsed.positive.contains("M"));
        assert!(!parsed.positive.contains("x"));
        assert_eq!(parsed.g_dd.get(0, 0), &RatFunc::parse("r").unwrap());
        assert_eq!(parsed.g_dd.get(1, 1), &RatFunc::parse("M*(x**2)**(1/2)").unwrap());
    }

    #[test]
    fn roots_of_undeclared_symbols_stay_roots() {
        let spec = MetricSpec::new(vec!["r".into()], vec![vec![json!("sqrt(r**2)")]]);
        let parsed = parse_metric(&spec).unwrap();
        assert_ne!(parsed.g_dd.get(0, 0), &RatFunc::parse("r").unwrap());
    }

    #[test]
    fn overrides_can_clear_defaults() {
        let mut overrides = Assumptions::new();
        overrides.insert("x".into(), [("real".to_string(), false)].into_iter().collect());
        let builder = AssumptionBuilder::new(&overrides).with_default("finite", true);
        let x = builder.build("x");
        assert!(!x.assumes("real"));
        assert!(x.assumes("finite"));
    }

    #[test]
    fn invalid_cell_reports_position() {
        let spec = MetricSpec::new(
            vec!["x".into(), "y".into()],
            vec![vec![json!(1), json!(0)], vec![json!(0), json!("1 +")]],
        );
        match parse_metric(&spec) {
            Err(TensorError::InvalidCell { row, col, .. }) => assert_eq!((row, col), (1, 1)),
            other => panic!("expected InvalidCell, got {other:?}"),
        }
    }

    #[test]
    fn non_scalar_cell_is_invalid() {
        let spec = MetricSpec::new(vec!["x".into()], vec![vec![json!([1])]]);
        assert!(matches!(
            parse_metric(&spec),
            Err(TensorError::InvalidCell { row: 0, col: 0, .. })
        ));
    }

    #[test]
    fn shape_errors_pass_through() {
        let spec = MetricSpec::new(vec!["x".into(), "x".into()], vec![]);
        assert_eq!(
            parse_metric(&spec),
            Err(TensorError::Spec(SpecError::DuplicateCoordinate("x".into())))
        );
    }
}
