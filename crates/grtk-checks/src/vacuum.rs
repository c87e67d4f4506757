//! # Vacuum Check
//!
//! A metric is a vacuum solution when its Einstein tensor vanishes.
//!
//! - **Symbolic** (no sample points): every `G_ab` must reduce to zero.
//! - **Numeric** (sample points given): the maximum `|G_ab|` over all
//!   samples must not exceed `epsilon`. A sample that cannot be evaluated
//!   is skipped; the check fails when every sample is skipped.

use grtk_core::{CheckResult, SamplePoint};
use grtk_tensor::{sweep, Spacetime};

use crate::symmetry::errored;

pub const VACUUM: &str = "vacuum";

/// Tolerance used when the caller gives none.
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Run the vacuum check. An empty sample list selects symbolic mode.
pub fn vacuum(space: &Spacetime, sample_points: Option<&[SamplePoint]>, epsilon: Option<f64>) -> CheckResult {
    let einstein = match space.einstein() {
        Ok(einstein) => einstein,
        Err(error) => return errored(VACUUM, &error),
    };
    let samples = match sample_points {
        Some(samples) if !samples.is_empty() => samples,
        _ => {
            let passed = einstein.is_zero();
            let result = CheckResult::verdict(VACUUM, passed).with_notes("mode=symbolic");
            return if passed {
                result
            } else {
                result.with_residual("G_ab != 0")
            };
        }
    };

    let threshold = epsilon.unwrap_or(DEFAULT_EPSILON);
    let outcome = sweep(einstein.components(), samples);
    if outcome.is_empty() {
        return CheckResult::fail(VACUUM).with_notes(format!(
            "mode=numeric threshold={threshold:?} no sample could be evaluated ({} skipped)",
            outcome.skipped.len()
        ));
    }
    let max_abs = outcome.max_abs;
    tracing::debug!(max_abs, threshold, skipped = outcome.skipped.len(), "numeric vacuum check");
    let mut notes = format!("mode=numeric max_abs={max_abs:?} threshold={threshold:?}");
    if !outcome.skipped.is_empty() {
        notes.push_str(&format!(" skipped={}", outcome.skipped.len()));
    }
    CheckResult::verdict(VACUUM, max_abs <= threshold)
        .with_residual(format!("{max_abs:?}"))
        .with_notes(notes)
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

    fn schwarzschild() -> Spacetime {
        diagonal(
            &["t", "r", "theta", "phi"],
            &["-(1 - 2*M/r)", "1/(1 - 2*M/r)", "r**2", "r**2*sin(theta)**2"],
        )
    }

    fn sample(pairs: &[(&str, f64)]) -> SamplePoint {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn symbolic_schwarzschild_passes() {
        let result = vacuum(&schwarzschild(), None, None);
        assert!(result.passed);
        assert_eq!(result.notes.as_deref(), Some("mode=symbolic"));
    }

    #[test]
    fn numeric_schwarzschild_passes() {
        let samples = vec![sample(&[("t", 0.0), ("r", 10.0), ("theta", 1.2), ("phi", 0.5), ("M", 1.0)])];
        let result = vacuum(&schwarzschild(), Some(&samples), Some(1e-6));
        assert!(result.passed, "{result:?}");
        assert!(result.notes.unwrap().starts_with("mode=numeric max_abs="));
    }

    #[test]
    fn symbolic_two_sphere_fails() {
        let space = diagonal(&["theta", "phi", "z"], &["r**2", "r**2*sin(theta)**2", "1"]);
        let result = vacuum(&space, None, None);
        assert!(!result.passed);
        assert_eq!(result.residual.as_deref(), Some("G_ab != 0"));
    }

    #[test]
    fn numeric_frw_fails_against_threshold() {
        let space = diagonal(&["t", "x", "y", "z"], &["-1", "t**2", "t**2", "t**2"]);
        let samples = vec![sample(&[("t", 1.0), ("x", 0.0), ("y", 0.0), ("z", 0.0)])];
        let result = vacuum(&space, Some(&samples), None);
        assert!(!result.passed);
        assert!(result.notes.unwrap().contains("threshold=1e-8"));
    }

    #[test]
    fn every_sample_skipped_fails() {
        let samples = vec![sample(&[("r", 10.0)])];
        let result = vacuum(&schwarzschild(), Some(&samples), None);
        // Einstein is identically zero, so nothing needs binding.
        assert!(result.passed);

        let space = diagonal(&["t", "x", "y", "z"], &["-1", "t**2", "t**2", "t**2"]);
        let result = vacuum(&space, Some(&samples), None);
        assert!(!result.passed);
        assert!(result.notes.unwrap().contains("no sample could be evaluated"));
    }

    #[test]
    fn empty_sample_list_is_symbolic() {
        let result = vacuum(&schwarzschild(), Some(&[]), None);
        assert_eq!(result.notes.as_deref(), Some("mode=symbolic"));
    }
}
