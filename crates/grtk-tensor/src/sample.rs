//! # Numeric Sampling
//!
//! Evaluates symbolic components at named sample points. A sample point
//! binds symbol names to `f64` values; symbols it does not bind stay
//! unbound and make the evaluation fail with [`EvalError::Unbound`].

use grtk_cas::{EvalError, RatFunc};
use grtk_core::SamplePoint;

/// Largest absolute value of `values` at one sample point.
pub fn max_abs_at(values: &[RatFunc], point: &SamplePoint) -> Result<f64, EvalError> {
    values.iter().try_fold(0.0_f64, |max, value| {
        if value.is_zero() {
            return Ok(max);
        }
        Ok(max.max(value.eval(point)?.abs()))
    })
}

/// Result of sweeping components over several sample points.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSweep {
    /// Maximum absolute component value over the evaluated samples.
    pub max_abs: f64,
    /// Samples that evaluated.
    pub evaluated: usize,
    /// Samples skipped because evaluation failed.
    pub skipped: Vec<(usize, EvalError)>,
}

impl SampleSweep {
    /// Whether no sample evaluated.
    pub fn is_empty(&self) -> bool {
        self.evaluated == 0
    }
}

/// Max |value| over all `points`, skipping samples whose evaluation fails.
pub fn sweep(values: &[RatFunc], points: &[SamplePoint]) -> SampleSweep {
    let mut outcome = SampleSweep {
        max_abs: 0.0,
        evaluated: 0,
        skipped: Vec::new(),
    };
    for (index, point) in points.iter().enumerate() {
        match max_abs_at(values, point) {
            Ok(max) => {
                outcome.max_abs = outcome.max_abs.max(max);
                outcome.evaluated += 1;
            }
            Err(error) => {
                tracing::debug!(sample = index, %error, "skipping sample");
                outcome.skipped.push((index, error));
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(pairs: &[(&str, f64)]) -> SamplePoint {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn rf(text: &str) -> RatFunc {
        RatFunc::parse(text).unwrap()
    }

    #[test]
    fn max_abs_takes_absolute_values() {
        let values = vec![rf("x"), rf("-3*x"), RatFunc::zero()];
        assert_eq!(max_abs_at(&values, &point(&[("x", 2.0)])).unwrap(), 6.0);
    }

    #[test]
    fn zero_components_need_no_bindings() {
        let values = vec![RatFunc::zero(), rf("1")];
        assert_eq!(max_abs_at(&values, &SamplePoint::new()).unwrap(), 1.0);
    }

    #[test]
    fn unbound_symbol_fails() {
        let values = vec![rf("M/r")];
        assert_eq!(
            max_abs_at(&values, &point(&[("r", 2.0)])),
            Err(EvalError::Unbound("M".into()))
        );
    }

    #[test]
    fn sweep_skips_failing_samples() {
        let values = vec![rf("1/x")];
        let outcome = sweep(&values, &[point(&[("x", 0.0)]), point(&[("x", 0.5)]), point(&[])]);
        assert_eq!(outcome.evaluated, 1);
        assert_eq!(outcome.max_abs, 2.0);
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outcome.skipped[0].1, EvalError::NonFinite);
    }

    #[test]
    fn sweep_over_nothing_is_empty() {
        assert!(sweep(&[rf("x")], &[]).is_empty());
    }
}
