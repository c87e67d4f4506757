//! # Numeric Spot-check
//!
//! Samples an expression, a tensor, or both, and reports the largest
//! absolute value seen. Unlike the vacuum check, any evaluation failure
//! fails the whole check.

use grtk_cas::RatFunc;
use grtk_core::{CheckResult, SamplePoint, TensorArtifact};
use grtk_tensor::{max_abs_at, Tensor};

pub const NUMERIC_SPOTCHECK: &str = "numeric_spotcheck";

fn failed(notes: &str) -> CheckResult {
    CheckResult::fail(NUMERIC_SPOTCHECK).with_notes(notes)
}

/// Max |value| of `expression` and every component of `tensor` over
/// `sample_points`.
pub fn numeric_spotcheck(
    expression: Option<&str>,
    tensor: Option<&TensorArtifact>,
    sample_points: &[SamplePoint],
) -> CheckResult {
    if sample_points.is_empty() {
        return failed("no sample_points provided");
    }
    let mut max_abs = 0.0_f64;

    if let Some(text) = expression {
        let Ok(value) = RatFunc::parse(text) else {
            return failed("failed to evaluate expression");
        };
        let values = [value];
        for point in sample_points {
            match max_abs_at(&values, point) {
                Ok(sampled) => max_abs = max_abs.max(sampled),
                Err(_) => return failed("failed to evaluate expression"),
            }
        }
    }

    if let Some(artifact) = tensor {
        let Ok(parsed) = Tensor::from_artifact(artifact) else {
            return failed("failed to evaluate tensor");
        };
        for point in sample_points {
            match max_abs_at(parsed.components(), point) {
                Ok(sampled) => max_abs = max_abs.max(sampled),
                Err(_) => return failed("failed to evaluate tensor"),
            }
        }
    }

    CheckResult::pass(NUMERIC_SPOTCHECK)
        .with_residual(format!("{max_abs:?}"))
        .with_notes(format!("max_abs={max_abs:?}"))
}
