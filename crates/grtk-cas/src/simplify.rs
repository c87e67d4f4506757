//! # Tiered Simplification
//!
//! | Level | Form                                                   |
//! |-------|--------------------------------------------------------|
//! | 0     | parse and print, no algebra                            |
//! | 1     | rational-function normal form                          |
//! | 2     | level 1 written over a single integer-scaled fraction  |
//! | 3+    | level 2 with the numerator's content factored out      |
//!
//! Simplification never fails. When a tier cannot be computed the next
//! lower tier is returned, and text that does not parse is returned as is.
//! Applying the same level to the printed result again yields the same
//! text.

use tracing::debug;

use crate::expr::Expr;
use crate::ratfunc::RatFunc;

/// Simplify `text` at `level`, returning printed text.
pub fn simplify_expr(text: &str, level: u8) -> String {
    let parsed = match Expr::parse(text) {
        Ok(parsed) => parsed,
        Err(error) => {
            debug!(%error, "simplify: input does not parse, returned unchanged");
            return text.to_string();
        }
    };
    if level == 0 {
        return parsed.to_string();
    }
    match RatFunc::from_expr(&parsed) {
        Ok(value) => simplify_ratfunc(&value, level).to_string(),
        Err(error) => {
            debug!(%error, level, "simplify: normal form unavailable, using level 0");
            parsed.to_string()
        }
    }
}

/// Output form of an already normalized value at `level`.
pub fn simplify_ratfunc(value: &RatFunc, level: u8) -> Expr {
    match level {
        0 | 1 => value.to_expr(),
        2 => value.together_expr(),
        _ => value.factor_expr(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_zero_only_reprints() {
        assert_eq!(simplify_expr("x*x", 0), "x*x");
        assert_eq!(simplify_expr("x*x", 1), "x**2");
    }

    #[test]
    fn pythagorean_identity() {
        assert_eq!(simplify_expr("sin(x)**2 + cos(x)**2", 1), "1");
    }

    #[test]
    fn angle_addition() {
        assert_eq!(simplify_expr("sin(x+y) - sin(x)*cos(y) - cos(x)*sin(y)", 1), "0");
        assert_eq!(simplify_expr("cos(2*x) + 2*sin(x)**2", 2), "1");
    }

    #[test]
    fn cancels_rational_functions() {
        assert_eq!(simplify_expr("(x**2 - 1)/(x - 1)", 1), "x + 1");
        assert_eq!(simplify_expr("(x**2 - 1)/(x - 1)", 3), "x + 1");
    }

    #[test]
    fn unparseable_text_is_returned_unchanged() {
        assert_eq!(simplify_expr("x +* y", 2), "x +* y");
    }

    #[test]
    fn unsupported_algebra_falls_back_to_reprint() {
        assert_eq!(simplify_expr("1/(x - x)", 1), "1/(x - x)");
    }

    #[test]
    fn schwarzschild_inverse_component() {
        let simplified = simplify_expr("1/(-(1 - 2*M/r))", 1);
        let difference = format!("({simplified}) - r/(2*M - r)");
        assert_eq!(simplify_expr(&difference, 1), "0");
    }

    mod proptests {
        use super::super::*;
        use proptest::prelude::*;

        fn leaf() -> impl Strategy<Value = String> {
            prop_oneof![
                (1i64..5).prop_map(|n| n.to_string()),
                Just("x".to_string()),
                Just("y".to_string()),
                Just("sin(x)".to_string()),
                Just("cos(x)".to_string()),
            ]
        }

        fn expression() -> impl Strategy<Value = String> {
            leaf().prop_recursive(3, 16, 2, |inner| {
                prop_oneof![
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a}) + ({b})")),
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a}) - ({b})")),
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a})*({b})")),
                    (inner.clone(), 1u32..3).prop_map(|(a, n)| format!("({a})**{n}")),
                ]
            })
        }

        proptest! {
            #[test]
            fn simplification_is_idempotent(text in expression(), level in 0u8..4) {
                let once = simplify_expr(&text, level);
                let twice = simplify_expr(&once, level);
                prop_assert_eq!(once, twice);
            }

            #[test]
            fn simplified_text_is_equivalent(text in expression()) {
                let simplified = simplify_expr(&text, 1);
                let difference = format!("({text}) - ({simplified})");
                prop_assert_eq!(simplify_expr(&difference, 1), "0");
            }
        }
    }
}
