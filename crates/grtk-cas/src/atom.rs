//! # Atoms
//!
//! The indivisible variables of the normal form: symbols, elementary
//! function applications, undefined functions (with partial-derivative
//! orders per argument slot), `q`-th roots of polynomials, and powers with
//! symbolic exponents.
//!
//! Atom arguments are themselves in normal form, so `sin(y + x)` and
//! `sin(x + y)` are the same atom. The derived ordering places `Cos` before
//! `Sin` (and `Cosh` before `Sinh`), which makes `cos(u)**2 → 1 - sin(u)**2`
//! a term-order-decreasing rewrite.

use std::collections::BTreeMap;
use std::sync::Arc;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::One;

use crate::error::CasError;
use crate::expr::Expr;
use crate::poly::Poly;
use crate::ratfunc::RatFunc;

/// Shared handle to an atom.
pub type AtomRef = Arc<Atom>;

/// Elementary functions kept as atoms. `tan`, `tanh`, `sqrt`, `Abs` and
/// the reciprocal functions (`sec`, `csc`, `cot` and their hyperbolic
/// versions) are rewritten on construction and never appear here. `ln` is
/// read as `log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Function {
    Cos,
    Sin,
    Cosh,
    Sinh,
    Exp,
    Log,
    Asin,
    Acos,
    Atan,
}

impl Function {
    pub fn name(self) -> &'static str {
        match self {
            Self::Cos => "cos",
            Self::Sin => "sin",
            Self::Cosh => "cosh",
            Self::Sinh => "sinh",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "cos" => Self::Cos,
            "sin" => Self::Sin,
            "cosh" => Self::Cosh,
            "sinh" => Self::Sinh,
            "exp" => Self::Exp,
            "log" | "ln" => Self::Log,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            _ => return None,
        })
    }

    /// `f(-u) = -f(u)`.
    pub fn is_odd(self) -> bool {
        matches!(self, Self::Sin | Self::Sinh | Self::Asin | Self::Atan)
    }

    /// `f(-u) = f(u)`.
    pub fn is_even(self) -> bool {
        matches!(self, Self::Cos | Self::Cosh)
    }
}

/// A variable of the polynomial normal form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Atom {
    Symbol(String),
    Func(Function, RatFunc),
    /// `name(args)` differentiated `orders[i]` times in slot `i`.
    Undefined {
        name: String,
        args: Vec<RatFunc>,
        orders: Vec<u32>,
    },
    /// `base ** (1/index)`.
    Root { base: Poly, index: u32 },
    /// `base ** exponent` with a non-constant exponent.
    Power { base: RatFunc, exponent: RatFunc },
}

impl Atom {
    pub fn symbol(name: impl Into<String>) -> AtomRef {
        Arc::new(Self::Symbol(name.into()))
    }

    pub fn into_ref(self) -> AtomRef {
        Arc::new(self)
    }

    /// Exponent at which the atom's rewrite rule applies.
    pub fn reduction_period(&self) -> Option<u32> {
        match self {
            Self::Func(Function::Cos | Function::Cosh, _) => Some(2),
            Self::Root { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// `(period, replacement)` such that `atom**period == replacement`.
    pub fn reduction(&self) -> Option<(u32, Poly)> {
        match self {
            Self::Func(Function::Cos, u) => {
                let sin = Poly::atom(Self::Func(Function::Sin, u.clone()).into_ref());
                Some((2, &Poly::one() - &sin.pow(2)))
            }
            Self::Func(Function::Cosh, u) => {
                let sinh = Poly::atom(Self::Func(Function::Sinh, u.clone()).into_ref());
                Some((2, &Poly::one() + &sinh.pow(2)))
            }
            Self::Root { base, index } => Some((*index, base.clone())),
            _ => None,
        }
    }

    /// Whether the atom varies with `var`.
    pub fn depends_on(&self, var: &str) -> bool {
        match self {
            Self::Symbol(name) => name == var,
            Self::Func(_, arg) => arg.depends_on(var),
            Self::Undefined { args, .. } => args.iter().any(|a| a.depends_on(var)),
            Self::Root { base, .. } => base.atoms().iter().any(|a| a.depends_on(var)),
            Self::Power { base, exponent } => base.depends_on(var) || exponent.depends_on(var),
        }
    }

    pub fn to_expr(&self) -> Expr {
        match self {
            Self::Symbol(name) => Expr::Symbol(name.clone()),
            Self::Func(function, arg) => Expr::call(function.name(), vec![arg.to_expr()]),
            Self::Undefined { name, args, orders } => undefined_expr(name, args, orders),
            Self::Root { base, index } => Expr::pow(
                base.to_expr(),
                Expr::Number(BigRational::new(BigInt::one(), BigInt::from(*index))),
            ),
            Self::Power { base, exponent } => Expr::pow(base.to_expr(), exponent.to_expr()),
        }
    }

    /// Expression for `atom ** exponent`, folding root indices.
    pub fn power_expr(&self, exponent: u32) -> Expr {
        match self {
            Self::Root { base, index } => Expr::pow(
                base.to_expr(),
                Expr::Number(BigRational::new(BigInt::from(exponent), BigInt::from(*index))),
            ),
            _ if exponent == 1 => self.to_expr(),
            _ => Expr::pow(self.to_expr(), Expr::integer(i64::from(exponent))),
        }
    }

    /// Derivative with respect to the symbol `var`.
    pub fn derivative(&self, var: &str) -> Result<RatFunc, CasError> {
        if !self.depends_on(var) {
            return Ok(RatFunc::zero());
        }
        match self {
            Self::Symbol(_) => Ok(RatFunc::one()),
            Self::Func(function, arg) => {
                let inner = arg.diff(var)?;
                let outer = function_derivative(*function, arg)?;
                Ok(&outer * &inner)
            }
            Self::Undefined { name, args, orders } => {
                let mut total = RatFunc::zero();
                for (slot, arg) in args.iter().enumerate() {
                    let inner = arg.diff(var)?;
                    if inner.is_zero() {
                        continue;
                    }
                    let mut raised = orders.clone();
                    raised[slot] += 1;
                    let partial = RatFunc::undefined(name, args.clone(), raised);
                    total = &total + &(&partial * &inner);
                }
                Ok(total)
            }
            Self::Root { base, index } => {
                let base = RatFunc::from_poly(base.clone());
                let scale = RatFunc::constant(BigRational::new(BigInt::one(), BigInt::from(*index)));
                let own = RatFunc::from_atom(Arc::new(self.clone()));
                let log_derivative = base.diff(var)?.checked_div(&base)?;
                Ok(&(&own * &scale) * &log_derivative)
            }
            Self::Power { base, exponent } => {
                let own = RatFunc::from_atom(Arc::new(self.clone()));
                let log_base = RatFunc::apply(Function::Log, base.clone())?;
                let first = &exponent.diff(var)? * &log_base;
                let second = &(exponent * &base.diff(var)?).checked_div(base)?;
                Ok(&own * &(&first + second))
            }
        }
    }

    /// Replace symbols by values, renormalizing every enclosing function.
    pub fn substitute(&self, values: &BTreeMap<String, RatFunc>) -> Result<RatFunc, CasError> {
        match self {
            Self::Symbol(name) => Ok(values
                .get(name)
                .cloned()
                .unwrap_or_else(|| RatFunc::from_atom(Arc::new(self.clone())))),
            Self::Func(function, arg) => RatFunc::apply(*function, arg.substitute(values)?),
            Self::Undefined { name, args, orders } => {
                let args = args
                    .iter()
                    .map(|a| a.substitute(values))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RatFunc::undefined(name, args, orders.clone()))
            }
            Self::Root { base, index } => RatFunc::from_poly(base.clone())
                .substitute(values)?
                .pow_rational(&BigRational::new(BigInt::one(), BigInt::from(*index))),
            Self::Power { base, exponent } => {
                RatFunc::power(&base.substitute(values)?, &exponent.substitute(values)?)
            }
        }
    }
}

/// `d f(u) / du` as a function of `u`.
fn function_derivative(function: Function, u: &RatFunc) -> Result<RatFunc, CasError> {
    let one_minus_square = &RatFunc::one() - &(u * u);
    let half = BigRational::new(BigInt::one(), BigInt::from(2));
    match function {
        Function::Cos => Ok(-&RatFunc::apply(Function::Sin, u.clone())?),
        Function::Sin => RatFunc::apply(Function::Cos, u.clone()),
        Function::Cosh => RatFunc::apply(Function::Sinh, u.clone()),
        Function::Sinh => RatFunc::apply(Function::Cosh, u.clone()),
        Function::Exp => RatFunc::apply(Function::Exp, u.clone()),
        Function::Log => u.recip(),
        Function::Asin => one_minus_square.pow_rational(&-half),
        Function::Acos => Ok(-&one_minus_square.pow_rational(&-half)?),
        Function::Atan => (&RatFunc::one() + &(u * u)).recip(),
    }
}

/// `f(args)`, or `Derivative(f(args), ...)` when any order is positive.
///
/// Derivative variables are written as symbols when every argument is a
/// distinct plain symbol, and as integer argument slots otherwise.
fn undefined_expr(name: &str, args: &[RatFunc], orders: &[u32]) -> Expr {
    let arg_exprs: Vec<Expr> = args.iter().map(RatFunc::to_expr).collect();
    let call = Expr::call(name, arg_exprs.clone());
    if orders.iter().all(|o| *o == 0) {
        return call;
    }
    let mut names: Vec<&str> = Vec::with_capacity(arg_exprs.len());
    for arg in &arg_exprs {
        match arg {
            Expr::Symbol(symbol) if !names.contains(&symbol.as_str()) => names.push(symbol),
            _ => {
                names.clear();
                break;
            }
        }
    }
    let by_symbol = names.len() == arg_exprs.len();
    let mut derivative_args = vec![call];
    for (slot, order) in orders.iter().enumerate() {
        for _ in 0..*order {
            derivative_args.push(if by_symbol {
                Expr::symbol(names[slot])
            } else {
                Expr::integer(slot as i64)
            });
        }
    }
    Expr::call("Derivative", derivative_args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trig_ordering_puts_cos_first() {
        let u = RatFunc::symbol("x");
        let cos = Atom::Func(Function::Cos, u.clone());
        let sin = Atom::Func(Function::Sin, u);
        assert!(cos < sin);
    }

    #[test]
    fn function_names_round_trip() {
        for f in [
            Function::Cos,
            Function::Sin,
            Function::Cosh,
            Function::Sinh,
            Function::Exp,
            Function::Log,
            Function::Asin,
            Function::Acos,
            Function::Atan,
        ] {
            assert_eq!(Function::from_name(f.name()), Some(f));
        }
        assert_eq!(Function::from_name("tan"), None);
        assert_eq!(Function::from_name("ln"), Some(Function::Log));
    }

    #[test]
    fn undefined_derivative_prints_with_symbols() {
        let atom = Atom::Undefined {
            name: "a".into(),
            args: vec![RatFunc::symbol("t")],
            orders: vec![2],
        };
        assert_eq!(atom.to_expr().to_string(), "Derivative(a(t), t, t)");
    }

    #[test]
    fn undefined_derivative_prints_slots_for_repeated_args() {
        let atom = Atom::Undefined {
            name: "f".into(),
            args: vec![RatFunc::symbol("x"), RatFunc::symbol("x")],
            orders: vec![0, 1],
        };
        assert_eq!(atom.to_expr().to_string(), "Derivative(f(x, x), 1)");
    }

    #[test]
    fn depends_on_looks_through_arguments() {
        let atom = Atom::Func(Function::Sin, RatFunc::symbol("theta"));
        assert!(atom.depends_on("theta"));
        assert!(!atom.depends_on("r"));
    }
}
