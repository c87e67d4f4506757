//! # Contracted Bianchi Identity
//!
//! `∇_a G^a_b = ∂_a G^a_b + Γ^a_{ac} G^c_b − Γ^c_{ab} G^a_c` must vanish for
//! every `b`. The mixed Einstein tensor is `G^a_b = g^{ac} G_{cb}`.

use grtk_cas::RatFunc;
use grtk_core::CheckResult;
use grtk_tensor::{Spacetime, TensorError};

use crate::symmetry::errored;

pub const CONTRACTED_BIANCHI: &str = "contracted_bianchi";

/// Divergence of the mixed Einstein tensor, component `b`.
pub fn einstein_divergence(space: &Spacetime, b: usize) -> Result<RatFunc, TensorError> {
    let n = space.dimension();
    let gamma = space.christoffel()?;
    let mixed = space.mixed_einstein()?;
    let mut total = RatFunc::zero();
    for a in 0..n {
        total = &total + &mixed.get(&[a, b]).diff(space.metric().coord(a))?;
        for c in 0..n {
            total = &total + &(gamma.get(&[a, a, c]) * mixed.get(&[c, b]));
            total = &total - &(gamma.get(&[c, a, b]) * mixed.get(&[a, c]));
        }
    }
    Ok(total)
}

/// Fails on the first non-vanishing component, reporting it as residual.
pub fn contracted_bianchi(space: &Spacetime) -> CheckResult {
    for b in 0..space.dimension() {
        match einstein_divergence(space, b) {
            Ok(total) if total.is_zero() => {}
            Ok(total) => {
                return CheckResult::fail(CONTRACTED_BIANCHI)
                    .with_residual(total.to_string())
                    .with_notes(format!("b={}", space.metric().coord(b)));
            }
            Err(error) => return errored(CONTRACTED_BIANCHI, &error),
        }
    }
    CheckResult::pass(CONTRACTED_BIANCHI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grtk_core::MetricSpec;
    use serde_json::{json, Value};

    fn diagonal(coords: &[&str], cells: &[&str]) -> Spacetime {
        let n = coords.len();
        let rows: Vec<Vec<Value>> = (0..n)
            .map(|i| (0..n).map(|j| if i == j { json!(cells[i]) } else { json!(0) }).collect())
            .collect();
        Spacetime::from_spec(&MetricSpec::new(coords.iter().map(|c| c.to_string()).collect(), rows))
            .unwrap()
    }

    #[test]
    fn holds_for_minkowski() {
        let space = diagonal(&["t", "x", "y", "z"], &["-1", "1", "1", "1"]);
        assert_eq!(contracted_bianchi(&space), CheckResult::pass(CONTRACTED_BIANCHI));
    }

    #[test]
    fn holds_for_frw() {
        let space = diagonal(&["t", "x", "y", "z"], &["-1", "a(t)**2", "a(t)**2", "a(t)**2"]);
        assert!(contracted_bianchi(&space).passed);
    }

    #[test]
    fn holds_for_two_sphere() {
        let space = diagonal(&["theta", "phi"], &["R**2", "R**2*sin(theta)**2"]);
        assert!(contracted_bianchi(&space).passed);
    }

    #[test]
    fn singular_metric_is_a_failed_check() {
        let space = diagonal(&["x", "y"], &["0", "1"]);
        let result = contracted_bianchi(&space);
        assert!(!result.passed);
        assert!(result.notes.is_some());
    }

    mod properties {
        use super::*;
        use crate::symmetry::{christoffel_symmetry, riemann_symmetries};
        use proptest::prelude::*;

        fn cell() -> impl Strategy<Value = &'static str> {
            prop_oneof![
                Just("-1"),
                Just("r**2"),
                Just("1 - 2*M/r"),
                Just("exp(t)"),
                Just("a(t)**2"),
                Just("r**2*sin(theta)**2"),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(12))]

            #[test]
            fn identities_hold_for_diagonal_metrics(cells in proptest::collection::vec(cell(), 3)) {
                let space = diagonal(&["t", "r", "theta"], &cells);
                prop_assert!(contracted_bianchi(&space).passed);
                prop_assert!(christoffel_symmetry(&space).passed);
                prop_assert!(riemann_symmetries(&space).iter().all(|r| r.passed));
            }
        }
    }
}
