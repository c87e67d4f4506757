//! # Symmetry Checks
//!
//! Structural symmetries of the metric, the connection and the covariant
//! Riemann tensor. Every sweep stops at the first component that does not
//! reduce to zero.

use grtk_cas::RatFunc;
use grtk_core::CheckResult;
use grtk_tensor::{ParsedMetric, Spacetime, Tensor, TensorError};

pub const METRIC_SYMMETRY: &str = "metric_symmetry";
pub const CHRISTOFFEL_SYMMETRY: &str = "christoffel_symmetry";
pub const RIEMANN_ANTISYM_LAST: &str = "riemann_antisym_last";
pub const RIEMANN_ANTISYM_FIRST: &str = "riemann_antisym_first";
pub const RIEMANN_PAIR_EXCHANGE: &str = "riemann_pair_exchange";

/// A failed result carrying the error that prevented the check.
pub(crate) fn errored(check_name: &str, error: &TensorError) -> CheckResult {
    tracing::debug!(check = check_name, %error, "check could not be evaluated");
    CheckResult::fail(check_name).with_notes(error.to_string())
}

/// `g_ij - g_ji` vanishes for every pair. On failure the residual is the
/// full difference matrix.
pub fn metric_symmetry(metric: &ParsedMetric) -> CheckResult {
    if metric.g_dd.is_symmetric() {
        return CheckResult::pass(METRIC_SYMMETRY);
    }
    let n = metric.dimension();
    let rows: Vec<String> = (0..n)
        .map(|i| {
            let cells: Vec<String> = (0..n)
                .map(|j| (metric.g_dd.get(i, j) - metric.g_dd.get(j, i)).to_string())
                .collect();
            format!("[{}]", cells.join(", "))
        })
        .collect();
    CheckResult::fail(METRIC_SYMMETRY).with_residual(format!("Matrix([{}])", rows.join(", ")))
}

/// The checks behind the metric-validate capability.
pub fn validate_metric(metric: &ParsedMetric) -> Vec<CheckResult> {
    vec![metric_symmetry(metric)]
}

/// `Γ^a_{bc} = Γ^a_{cb}` for every index triple.
pub fn christoffel_symmetry(space: &Spacetime) -> CheckResult {
    let gamma = match space.christoffel() {
        Ok(gamma) => gamma,
        Err(error) => return errored(CHRISTOFFEL_SYMMETRY, &error),
    };
    let n = gamma.dim();
    for a in 0..n {
        for b in 0..n {
            for c in (b + 1)..n {
                if !(gamma.get(&[a, b, c]) - gamma.get(&[a, c, b])).is_zero() {
                    return CheckResult::fail(CHRISTOFFEL_SYMMETRY)
                        .with_residual("Gamma^a_{bc} != Gamma^a_{cb}")
                        .with_notes(format!(
                            "a={} b={} c={}",
                            space.metric().coord(a),
                            space.metric().coord(b),
                            space.metric().coord(c)
                        ));
                }
            }
        }
    }
    CheckResult::pass(CHRISTOFFEL_SYMMETRY)
}

fn sweep_riemann(
    name: &str,
    lowered: &Tensor,
    residual: impl Fn(usize, usize, usize, usize) -> RatFunc,
) -> CheckResult {
    let n = lowered.dim();
    for a in 0..n {
        for b in 0..n {
            for c in 0..n {
                for d in 0..n {
                    if !residual(a, b, c, d).is_zero() {
                        return CheckResult::fail(name).with_residual(name);
                    }
                }
            }
        }
    }
    CheckResult::pass(name)
}

/// The three algebraic symmetries of `R_{abcd}`, each swept independently:
/// antisymmetry in the last pair, in the first pair, and pair exchange.
pub fn riemann_symmetries(space: &Spacetime) -> Vec<CheckResult> {
    let names = [RIEMANN_ANTISYM_LAST, RIEMANN_ANTISYM_FIRST, RIEMANN_PAIR_EXCHANGE];
    let r = match space.riemann_lowered() {
        Ok(r) => r,
        Err(error) => return names.iter().map(|name| errored(name, &error)).collect(),
    };
    vec![
        sweep_riemann(RIEMANN_ANTISYM_LAST, r, |a, b, c, d| {
            r.get(&[a, b, c, d]) + r.get(&[a, b, d, c])
        }),
        sweep_riemann(RIEMANN_ANTISYM_FIRST, r, |a, b, c, d| {
            r.get(&[a, b, c, d]) + r.get(&[b, a, c, d])
        }),
        sweep_riemann(RIEMANN_PAIR_EXCHANGE, r, |a, b, c, d| {
            r.get(&[a, b, c, d]) - r.get(&[c, d, a, b])
        }),
    ]
}
