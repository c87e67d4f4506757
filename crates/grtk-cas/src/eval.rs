//! # Numeric Evaluation
//!
//! Evaluates an [`Expr`] to `f64` under a name → value environment. `pi`
//! and `E` evaluate to their constants unless the environment binds them.
//! Partial derivatives and undefined functions have no numeric value and
//! produce [`EvalError::Unsupported`].

use std::collections::BTreeMap;

use num_rational::BigRational;
use num_traits::ToPrimitive;

use crate::error::EvalError;
use crate::expr::Expr;

/// Symbol name → numeric value.
pub type Environment = BTreeMap<String, f64>;

impl Expr {
    /// Evaluate numerically. Infinite or NaN results are errors.
    pub fn eval(&self, env: &Environment) -> Result<f64, EvalError> {
        let value = eval_inner(self, env)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvalError::NonFinite)
        }
    }
}

/// Nearest `f64` to an exact rational.
pub fn rational_to_f64(value: &BigRational) -> f64 {
    match (value.numer().to_f64(), value.denom().to_f64()) {
        (Some(numer), Some(denom)) => numer / denom,
        _ => f64::NAN,
    }
}

fn eval_inner(expr: &Expr, env: &Environment) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(value) => Ok(rational_to_f64(value)),
        Expr::Symbol(name) => match env.get(name) {
            Some(value) => Ok(*value),
            None => match name.as_str() {
                "pi" => Ok(std::f64::consts::PI),
                "E" => Ok(std::f64::consts::E),
                _ => Err(EvalError::Unbound(name.clone())),
            },
        },
        Expr::Add(terms) => terms
            .iter()
            .try_fold(0.0, |acc, term| Ok(acc + eval_inner(term, env)?)),
        Expr::Mul(factors) => factors
            .iter()
            .try_fold(1.0, |acc, factor| Ok(acc * eval_inner(factor, env)?)),
        Expr::Pow(base, exponent) => {
            let base = eval_inner(base, env)?;
            match exponent.as_number() {
                Some(power) if power.is_integer() => match power.numer().to_i32() {
                    Some(small) => Ok(base.powi(small)),
                    None => Ok(base.powf(rational_to_f64(power))),
                },
                _ => Ok(base.powf(eval_inner(exponent, env)?)),
            }
        }
        Expr::Call(name, args) => eval_call(name, args, env),
    }
}

fn eval_call(name: &str, args: &[Expr], env: &Environment) -> Result<f64, EvalError> {
    if name == "log" && args.len() == 2 {
        let value = eval_inner(&args[0], env)?;
        let base = eval_inner(&args[1], env)?;
        return Ok(value.ln() / base.ln());
    }
    let [arg] = args else {
        return Err(EvalError::Unsupported(format!("{name}/{}", args.len())));
    };
    let f: fn(f64) -> f64 = match name {
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "exp" => f64::exp,
        "log" | "ln" => f64::ln,
        "sec" => |x| x.cos().recip(),
        "csc" => |x| x.sin().recip(),
        "cot" => |x| x.tan().recip(),
        "sech" => |x| x.cosh().recip(),
        "csch" => |x| x.sinh().recip(),
        "coth" => |x| x.tanh().recip(),
        "sqrt" => f64::sqrt,
        "sinh" => f64::sinh,
        "cosh" => f64::cosh,
        "tanh" => f64::tanh,
        "asin" => f64::asin,
        "acos" => f64::acos,
        "atan" => f64::atan,
        "abs" | "Abs" => f64::abs,
        other => return Err(EvalError::Unsupported(other.to_string())),
    };
    Ok(f(eval_inner(arg, env)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, f64)]) -> Environment {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn eval(text: &str, pairs: &[(&str, f64)]) -> Result<f64, EvalError> {
        Expr::parse(text).unwrap().eval(&env(pairs))
    }

    #[test]
    fn evaluates_arithmetic() {
        let value = eval("-(1 - 2*M/r)", &[("M", 1.0), ("r", 10.0)]).unwrap();
        assert!((value + 0.8).abs() < 1e-12);
        let value = eval("r**2*sin(theta)**2", &[("r", 2.0), ("theta", 0.5)]).unwrap();
        assert!((value - 4.0 * 0.5f64.sin().powi(2)).abs() < 1e-12);
    }

    #[test]
    fn constants_unless_bound() {
        assert!((eval("pi", &[]).unwrap() - std::f64::consts::PI).abs() < 1e-15);
        assert_eq!(eval("pi", &[("pi", 3.0)]).unwrap(), 3.0);
        assert!((eval("log(E)", &[]).unwrap() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn reciprocal_functions() {
        let value = eval("sec(x)**2 - ln(E)", &[("x", 0.3)]).unwrap();
        assert!((value - (1.0 / 0.3f64.cos().powi(2) - 1.0)).abs() < 1e-12);
        assert!((eval("coth(x)", &[("x", 2.0)]).unwrap() - 1.0 / 2.0f64.tanh()).abs() < 1e-12);
    }

    #[test]
    fn reports_unbound_symbols() {
        assert_eq!(eval("x + 1", &[]), Err(EvalError::Unbound("x".into())));
    }

    #[test]
    fn reports_unsupported_functions() {
        assert!(matches!(
            eval("Derivative(a(t), t)", &[("t", 1.0)]),
            Err(EvalError::Unsupported(_))
        ));
        assert!(matches!(
            eval("a(t)", &[("t", 1.0)]),
            Err(EvalError::Unsupported(_))
        ));
    }

    #[test]
    fn reports_non_finite() {
        assert_eq!(eval("1/x", &[("x", 0.0)]), Err(EvalError::NonFinite));
        assert_eq!(eval("log(x)", &[("x", -1.0)]), Err(EvalError::NonFinite));
    }

    #[test]
    fn two_argument_log() {
        assert!((eval("log(8, 2)", &[]).unwrap() - 3.0).abs() < 1e-12);
    }
}
