//! # Unit Checker
//!
//! Dimensional analysis over parsed expressions. Each symbol is given a
//! unit string such as `"m/s**2"` or `"kg*m**2/s**2"`; unit strings are
//! read with the same expression parser and resolved against a table of SI
//! base and derived units with metric prefixes.
//!
//! Propagation rules:
//!
//! | Node      | Dimension                                              |
//! |-----------|--------------------------------------------------------|
//! | Number    | dimensionless                                          |
//! | Symbol    | declared unit (`pi`, `E` are dimensionless if undeclared) |
//! | Add       | all terms must agree                                   |
//! | Mul       | sum of factor dimensions                               |
//! | Pow       | base dimension scaled by a numeric exponent            |
//! | Call      | every argument dimensionless, result dimensionless     |
//! | `sqrt`    | half the argument's dimension                          |
//! | `Abs`     | the argument's dimension                               |
//!
//! Geometrized unit systems (any name starting with `geom`) skip the check.

use std::collections::BTreeMap;
use std::fmt;

use grtk_cas::Expr;
use grtk_core::CheckResult;
use num_rational::{BigRational, Rational64};
use num_traits::{CheckedAdd, CheckedMul, ToPrimitive, Zero};

use crate::error::UnitError;

pub const UNIT_CHECK: &str = "unit_check";

const BASE_NAMES: [&str; 7] = ["m", "kg", "s", "A", "K", "mol", "cd"];

/// Exponents of the seven SI base dimensions: length, mass, time, current,
/// temperature, amount, luminous intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension([Rational64; 7]);

impl Dimension {
    pub fn dimensionless() -> Self {
        Self([Rational64::zero(); 7])
    }

    fn of(exponents: [i64; 7]) -> Self {
        Self(exponents.map(Rational64::from_integer))
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(Zero::is_zero)
    }

    fn times(self, other: Self) -> Result<Self, UnitError> {
        let mut out = self.0;
        for (slot, add) in out.iter_mut().zip(other.0) {
            *slot = slot.checked_add(&add).ok_or(UnitError::ExponentOverflow)?;
        }
        Ok(Self(out))
    }

    fn scaled(self, factor: Rational64) -> Result<Self, UnitError> {
        let mut out = self.0;
        for slot in out.iter_mut() {
            *slot = slot.checked_mul(&factor).ok_or(UnitError::ExponentOverflow)?;
        }
        Ok(Self(out))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = BASE_NAMES
            .iter()
            .zip(self.0)
            .filter(|(_, exponent)| !exponent.is_zero())
            .map(|(name, exponent)| {
                if exponent == Rational64::from_integer(1) {
                    name.to_string()
                } else if exponent.is_integer() {
                    format!("{name}**{exponent}")
                } else {
                    format!("{name}**({exponent})")
                }
            })
            .collect();
        if parts.is_empty() {
            f.write_str("dimensionless")
        } else {
            f.write_str(&parts.join("*"))
        }
    }
}

fn named_unit(name: &str) -> Option<Dimension> {
    let exponents = match name {
        "m" | "meter" | "metre" => [1, 0, 0, 0, 0, 0, 0],
        "g" | "gram" => [0, 1, 0, 0, 0, 0, 0],
        "s" | "second" => [0, 0, 1, 0, 0, 0, 0],
        "A" | "ampere" => [0, 0, 0, 1, 0, 0, 0],
        "K" | "kelvin" => [0, 0, 0, 0, 1, 0, 0],
        "mol" | "mole" => [0, 0, 0, 0, 0, 1, 0],
        "cd" | "candela" => [0, 0, 0, 0, 0, 0, 1],
        "Hz" | "hertz" => [0, 0, -1, 0, 0, 0, 0],
        "N" | "newton" => [1, 1, -2, 0, 0, 0, 0],
        "Pa" | "pascal" => [-1, 1, -2, 0, 0, 0, 0],
        "J" | "joule" | "eV" | "electronvolt" => [2, 1, -2, 0, 0, 0, 0],
        "W" | "watt" => [2, 1, -3, 0, 0, 0, 0],
        "C" | "coulomb" => [0, 0, 1, 1, 0, 0, 0],
        "V" | "volt" => [2, 1, -3, -1, 0, 0, 0],
        "ohm" => [2, 1, -3, -2, 0, 0, 0],
        "S" | "siemens" => [-2, -1, 3, 2, 0, 0, 0],
        "F" | "farad" => [-2, -1, 4, 2, 0, 0, 0],
        "T" | "tesla" => [0, 1, -2, -1, 0, 0, 0],
        "Wb" | "weber" => [2, 1, -2, -1, 0, 0, 0],
        "H" | "henry" => [2, 1, -2, -2, 0, 0, 0],
        "L" | "liter" | "litre" => [3, 0, 0, 0, 0, 0, 0],
        "min" | "minute" | "hour" | "day" | "year" | "yr" => [0, 0, 1, 0, 0, 0, 0],
        "au" | "pc" | "parsec" | "ly" | "lightyear" => [1, 0, 0, 0, 0, 0, 0],
        "rad" | "radian" | "sr" | "steradian" | "dimensionless" => [0; 7],
        _ => return None,
    };
    Some(Dimension::of(exponents))
}

const PREFIXES: [&str; 30] = [
    "yotta", "zetta", "exa", "peta", "tera", "giga", "mega", "kilo", "hecto", "deca", "deci",
    "centi", "milli", "micro", "nano", "pico", "femto", "atto", "Y", "Z", "E", "P", "G", "M", "k",
    "h", "da", "d", "c", "u",
];

const SHORT_SMALL_PREFIXES: [&str; 6] = ["m", "n", "p", "f", "a", "z"];

/// Dimension of a single unit name, with an optional metric prefix.
pub fn lookup_unit(name: &str) -> Option<Dimension> {
    if let Some(dimension) = named_unit(name) {
        return Some(dimension);
    }
    PREFIXES
        .iter()
        .chain(SHORT_SMALL_PREFIXES.iter())
        .filter_map(|prefix| name.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty())
        .find_map(named_unit)
}

/// Dimension of a unit string such as `"kg*m/s**2"`.
pub fn parse_unit(text: &str) -> Result<Dimension, UnitError> {
    let expr = Expr::parse(text)?;
    unit_dimension(&expr)
}

fn unit_dimension(expr: &Expr) -> Result<Dimension, UnitError> {
    match expr {
        Expr::Number(_) => Ok(Dimension::dimensionless()),
        Expr::Symbol(name) => lookup_unit(name).ok_or_else(|| UnitError::UnknownUnit(name.clone())),
        Expr::Mul(factors) => factors
            .iter()
            .try_fold(Dimension::dimensionless(), |acc, factor| acc.times(unit_dimension(factor)?)),
        Expr::Pow(base, exponent) => {
            let exponent = numeric_exponent(exponent)?;
            unit_dimension(base)?.scaled(exponent)
        }
        Expr::Add(_) | Expr::Call(..) => Err(UnitError::Unsupported),
    }
}

/// Fold a constant subtree into a rational.
fn constant_value(expr: &Expr) -> Option<BigRational> {
    match expr {
        Expr::Number(value) => Some(value.clone()),
        Expr::Add(terms) => terms
            .iter()
            .try_fold(BigRational::zero(), |acc, term| Some(acc + constant_value(term)?)),
        Expr::Mul(factors) => factors.iter().try_fold(
            BigRational::from_integer(1.into()),
            |acc, factor| Some(acc * constant_value(factor)?),
        ),
        Expr::Pow(base, exponent) => {
            let base = constant_value(base)?;
            let exponent = constant_value(exponent)?;
            if !exponent.is_integer() {
                return None;
            }
            let power = exponent.to_integer().to_i32()?;
            if (base.is_zero() && power < 0) || power.unsigned_abs() > 64 {
                return None;
            }
            let mut value = BigRational::from_integer(1.into());
            for _ in 0..power.unsigned_abs() {
                value *= &base;
            }
            Some(if power < 0 { value.recip() } else { value })
        }
        Expr::Symbol(_) | Expr::Call(..) => None,
    }
}

fn numeric_exponent(exponent: &Expr) -> Result<Rational64, UnitError> {
    let value = constant_value(exponent).ok_or(UnitError::NonNumericExponent)?;
    match (value.numer().to_i64(), value.denom().to_i64()) {
        (Some(numer), Some(denom)) => Ok(Rational64::new(numer, denom)),
        _ => Err(UnitError::Unsupported),
    }
}

/// Dimension of `expr` given the declared unit of every symbol.
pub fn expression_dimension(
    expr: &Expr,
    symbol_units: &BTreeMap<String, Dimension>,
) -> Result<Dimension, UnitError> {
    match expr {
        Expr::Number(_) => Ok(Dimension::dimensionless()),
        Expr::Symbol(name) => match symbol_units.get(name) {
            Some(dimension) => Ok(*dimension),
            None if name == "pi" || name == "E" => Ok(Dimension::dimensionless()),
            None => Err(UnitError::MissingUnit(name.clone())),
        },
        Expr::Add(terms) => {
            let mut dimensions = terms.iter().map(|term| expression_dimension(term, symbol_units));
            let first = dimensions.next().ok_or(UnitError::Unsupported)??;
            for dimension in dimensions {
                if dimension? != first {
                    return Err(UnitError::Mismatch);
                }
            }
            Ok(first)
        }
        Expr::Mul(factors) => factors.iter().try_fold(Dimension::dimensionless(), |acc, factor| {
            acc.times(expression_dimension(factor, symbol_units)?)
        }),
        Expr::Pow(base, exponent) => {
            let exponent = numeric_exponent(exponent)?;
            expression_dimension(base, symbol_units)?.scaled(exponent)
        }
        Expr::Call(name, args) if name == "sqrt" && args.len() == 1 => {
            expression_dimension(&args[0], symbol_units)?.scaled(Rational64::new(1, 2))
        }
        Expr::Call(name, args) if matches!(name.as_str(), "Abs" | "abs") && args.len() == 1 => {
            expression_dimension(&args[0], symbol_units)
        }
        Expr::Call(_, args) => {
            for arg in args {
                if !expression_dimension(arg, symbol_units)?.is_dimensionless() {
                    return Err(UnitError::DimensionfulArgument);
                }
            }
            Ok(Dimension::dimensionless())
        }
    }
}

/// Dimension of `expression` with symbol units given as unit strings.
pub fn check_expression(
    expression: &str,
    symbol_units: &BTreeMap<String, String>,
) -> Result<Dimension, UnitError> {
    let expr = Expr::parse(expression)?;
    let mut resolved = BTreeMap::new();
    for name in expr.symbols() {
        if let Some(unit) = symbol_units.get(&name) {
            resolved.insert(name, parse_unit(unit)?);
        }
    }
    expression_dimension(&expr, &resolved)
}

/// Run the unit check in `unit_system`.
pub fn unit_check(
    expression: &str,
    symbol_units: &BTreeMap<String, String>,
    unit_system: &str,
) -> CheckResult {
    if unit_system.to_lowercase().starts_with("geom") {
        return CheckResult::pass(UNIT_CHECK)
            .with_notes("geometrized units assumed; no dimension check applied");
    }
    match check_expression(expression, symbol_units) {
        Ok(dimension) => {
            tracing::debug!(%dimension, "unit check passed");
            CheckResult::pass(UNIT_CHECK)
        }
        Err(error) => CheckResult::fail(UNIT_CHECK).with_notes(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn derived_units_resolve_to_base_dimensions() {
        assert_eq!(parse_unit("N").unwrap(), parse_unit("kg*m/s**2").unwrap());
        assert_eq!(parse_unit("J").unwrap(), parse_unit("N*m").unwrap());
        assert_eq!(parse_unit("km").unwrap(), parse_unit("m").unwrap());
        assert_eq!(parse_unit("ms").unwrap(), parse_unit("s").unwrap());
        assert_eq!(parse_unit("kilometer/second").unwrap(), parse_unit("m/s").unwrap());
        assert!(parse_unit("1/s").unwrap() == parse_unit("Hz").unwrap());
    }

    #[test]
    fn unknown_unit_is_reported() {
        assert_eq!(parse_unit("furlong"), Err(UnitError::UnknownUnit("furlong".into())));
    }

    #[test]
    fn consistent_kinematics_pass() {
        let symbols = units(&[("x", "m"), ("v", "m/s"), ("t", "s"), ("a", "m/s**2")]);
        let result = unit_check("x + v*t + a*t**2/2", &symbols, "SI");
        assert_eq!(result, CheckResult::pass(UNIT_CHECK));
    }

    #[test]
    fn mismatched_sum_fails() {
        let symbols = units(&[("x", "m"), ("t", "s")]);
        let result = unit_check("x + t", &symbols, "SI");
        assert!(!result.passed);
        assert_eq!(result.notes.as_deref(), Some("unit mismatch in sum"));
    }

    #[test]
    fn missing_symbol_unit_fails() {
        let result = unit_check("x*y", &units(&[("x", "m")]), "SI");
        assert_eq!(result.notes.as_deref(), Some("missing unit for symbol 'y'"));
    }

    #[test]
    fn function_arguments_must_be_dimensionless() {
        let symbols = units(&[("x", "m"), ("k", "1/m"), ("t", "s")]);
        assert!(unit_check("sin(k*x)", &symbols, "SI").passed);
        let result = unit_check("exp(t)", &symbols, "SI");
        assert_eq!(result.notes.as_deref(), Some("function expects dimensionless argument"));
    }

    #[test]
    fn exponents_must_be_numeric() {
        let symbols = units(&[("x", "m"), ("n", "1")]);
        let result = unit_check("x**n", &symbols, "SI");
        assert_eq!(result.notes.as_deref(), Some("non-numeric exponent in unit expression"));
        assert!(unit_check("sqrt(x**2) - x", &symbols, "SI").passed);
        assert!(unit_check("(x**2)**(1/2) + x", &symbols, "SI").passed);
    }

    #[test]
    fn huge_exponents_fail_instead_of_overflowing() {
        let symbols = units(&[("x", "m")]);
        let result = unit_check("(x**4000000000)**4000000000", &symbols, "SI");
        assert!(!result.passed);
        assert_eq!(result.notes.as_deref(), Some("dimension exponent out of range"));
    }

    #[test]
    fn geometrized_skips_the_check() {
        let result = unit_check("x + t", &BTreeMap::new(), "Geometrized");
        assert!(result.passed);
        assert_eq!(
            result.notes.as_deref(),
            Some("geometrized units assumed; no dimension check applied")
        );
    }

    #[test]
    fn absolute_value_keeps_dimension() {
        let symbols = units(&[("x", "m"), ("t", "s")]);
        assert!(unit_check("Abs(x) + x", &symbols, "SI").passed);
        assert!(!unit_check("Abs(t) + x", &symbols, "SI").passed);
    }

    #[test]
    fn pi_is_dimensionless() {
        let symbols = units(&[("r", "m")]);
        assert!(unit_check("2*pi*r + r", &symbols, "SI").passed);
    }

    #[test]
    fn dimension_display() {
        assert_eq!(parse_unit("N").unwrap().to_string(), "m*kg*s**-2");
        assert_eq!(Dimension::dimensionless().to_string(), "dimensionless");
    }
}
