//! # Rational-Function Normal Form
//!
//! A [`RatFunc`] is a reduced [`Poly`] numerator over a product of
//! denominator factors. Every denominator factor is either a single atom or
//! a primitive polynomial (integer coefficients with gcd 1, positive leading
//! coefficient, no monomial content), so rational constants always live in
//! the numerator.
//!
//! ## Invariants
//!
//! - The numerator and every factor are reduced by the atom rewrite rules.
//! - No atom factor carries an exponent at or above its reduction period.
//! - Atom factors are cancelled against the numerator's monomial content;
//!   polynomial factors are cancelled by exact division.
//! - Zero is the zero numerator with no denominator.
//!
//! Combining two values over the union of their denominators leaves a
//! numerator that is the zero polynomial exactly when the value is zero, so
//! `is_zero` is an exact test on the supported algebra.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use num_bigint::BigInt;
use num_integer::{Integer, Roots};
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive};

use crate::atom::{Atom, AtomRef, Function};
use crate::error::{CasError, EvalError};
use crate::eval::Environment;
use crate::expr::Expr;
use crate::poly::{Monomial, Poly};
use crate::positivity::Positivity;

/// Largest integer exponent accepted by [`RatFunc::pow`].
const MAX_EXPONENT: i64 = 1000;

/// Largest root index accepted by [`RatFunc::pow_rational`].
const MAX_ROOT_INDEX: u32 = 64;

/// Largest integer multiple of an angle expanded by the addition formulas.
/// Larger multiples stay a single atom.
const MAX_ANGLE_MULTIPLE: u32 = 16;

/// Exact rational function in normal form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RatFunc {
    num: Poly,
    den: BTreeMap<Poly, u32>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl RatFunc {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::from_poly(Poly::one())
    }

    pub fn constant(value: BigRational) -> Self {
        Self::from_poly(Poly::constant(value))
    }

    pub fn integer(value: i64) -> Self {
        Self::from_poly(Poly::integer(value))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::from_atom(Atom::symbol(name))
    }

    pub fn from_poly(num: Poly) -> Self {
        Self {
            num,
            den: BTreeMap::new(),
        }
    }

    pub fn from_atom(atom: AtomRef) -> Self {
        Self::from_poly(Poly::atom(atom))
    }

    /// Application of an undefined function with the given derivative
    /// orders per argument slot.
    pub fn undefined(name: impl Into<String>, args: Vec<RatFunc>, orders: Vec<u32>) -> Self {
        Self::from_atom(
            Atom::Undefined {
                name: name.into(),
                args,
                orders,
            }
            .into_ref(),
        )
    }

    /// `num / Π factor**exponent`, normalized.
    pub fn from_parts(num: Poly, factors: Vec<(Poly, u32)>) -> Result<Self, CasError> {
        if factors.iter().any(|(f, e)| *e > 0 && f.is_zero()) {
            return Err(CasError::DivisionByZero);
        }
        Ok(Self::settle(num, factors))
    }

    /// Parse text and normalize it.
    pub fn parse(text: &str) -> Result<Self, CasError> {
        Self::from_expr(&Expr::parse(text)?)
    }

    /// Parse text, taking powers of the `positive` symbols out of roots.
    pub fn parse_in(text: &str, positive: &Positivity) -> Result<Self, CasError> {
        Self::from_expr_in(&Expr::parse(text)?, positive)
    }

    /// Split factors into primitive form, reduce atom factors, then cancel.
    /// Callers have already rejected zero factors.
    fn settle(num: Poly, factors: Vec<(Poly, u32)>) -> Self {
        if num.is_zero() {
            return Self::zero();
        }
        let mut num = num;
        let mut den: BTreeMap<Poly, u32> = BTreeMap::new();
        let mut pending = factors;
        loop {
            while let Some((factor, exponent)) = pending.pop() {
                if exponent == 0 || factor.is_zero() {
                    continue;
                }
                let (coefficient, content, rest) = factor.primitive_split();
                if !coefficient.is_one() {
                    num = num.scale(&num_traits::pow(coefficient.recip(), exponent as usize));
                }
                for (atom, e) in content.factors() {
                    *den.entry(Poly::atom(atom.clone())).or_insert(0) += e * exponent;
                }
                if !rest.is_one() {
                    *den.entry(rest).or_insert(0) += exponent;
                }
            }
            for (factor, exponent) in den.iter_mut() {
                let Some((period, replacement)) = factor.as_atom().and_then(|a| a.reduction())
                else {
                    continue;
                };
                if *exponent >= period {
                    pending.push((replacement, *exponent / period));
                    *exponent %= period;
                }
            }
            den.retain(|_, exponent| *exponent > 0);
            if pending.is_empty() {
                break;
            }
        }
        Self::cancel(num, den)
    }

    fn cancel(mut num: Poly, den: BTreeMap<Poly, u32>) -> Self {
        if num.is_zero() {
            return Self::zero();
        }
        let mut kept = BTreeMap::new();
        for (factor, mut exponent) in den {
            if let Some(atom) = factor.as_atom() {
                let shared = num.min_power(atom).min(exponent);
                if shared > 0 {
                    if let Some(quotient) = num.div_monomial(&Monomial::atom(atom.clone(), shared)) {
                        num = quotient;
                        exponent -= shared;
                    }
                }
            } else {
                while exponent > 0 {
                    match num.exact_div(&factor) {
                        Some(quotient) => {
                            num = quotient;
                            exponent -= 1;
                        }
                        None => break,
                    }
                }
            }
            if exponent > 0 {
                kept.insert(factor, exponent);
            }
        }
        Self { num, den: kept }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl RatFunc {
    pub fn numerator(&self) -> &Poly {
        &self.num
    }

    pub fn denominator(&self) -> impl Iterator<Item = (&Poly, u32)> {
        self.den.iter().map(|(f, e)| (f, *e))
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.den.is_empty() && self.num.is_one()
    }

    /// The value when the function is a constant.
    pub fn as_constant(&self) -> Option<BigRational> {
        if self.den.is_empty() {
            self.num.as_constant()
        } else {
            None
        }
    }

    /// The atom, when the function is exactly one atom.
    pub fn as_atom(&self) -> Option<&Atom> {
        if self.den.is_empty() {
            self.num.as_atom().map(|atom| &**atom)
        } else {
            None
        }
    }

    /// The leading numerator coefficient is negative.
    pub fn leading_is_negative(&self) -> bool {
        self.num.leading_is_negative()
    }

    pub fn depends_on(&self, var: &str) -> bool {
        self.num.atoms().iter().any(|a| a.depends_on(var))
            || self
                .den
                .keys()
                .any(|f| f.atoms().iter().any(|a| a.depends_on(var)))
    }

    /// Names of every symbol occurring anywhere in the function, including
    /// inside function arguments.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_symbols(&mut names);
        names
    }

    fn collect_symbols(&self, names: &mut BTreeSet<String>) {
        collect_poly_symbols(&self.num, names);
        for factor in self.den.keys() {
            collect_poly_symbols(factor, names);
        }
    }
}

fn collect_poly_symbols(poly: &Poly, names: &mut BTreeSet<String>) {
    for atom in poly.atoms() {
        match atom.as_ref() {
            Atom::Symbol(name) => {
                names.insert(name.clone());
            }
            Atom::Func(_, arg) => arg.collect_symbols(names),
            Atom::Undefined { args, .. } => {
                for arg in args {
                    arg.collect_symbols(names);
                }
            }
            Atom::Root { base, .. } => collect_poly_symbols(base, names),
            Atom::Power { base, exponent } => {
                base.collect_symbols(names);
                exponent.collect_symbols(names);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

impl RatFunc {
    pub fn recip(&self) -> Result<Self, CasError> {
        if self.is_zero() {
            return Err(CasError::DivisionByZero);
        }
        let mut num = Poly::one();
        for (factor, exponent) in &self.den {
            num = &num * &factor.pow(*exponent);
        }
        Ok(Self::settle(num, vec![(self.num.clone(), 1)]))
    }

    pub fn checked_div(&self, divisor: &RatFunc) -> Result<Self, CasError> {
        Ok(self * &divisor.recip()?)
    }

    /// Integer power. `0**0` is `1`.
    pub fn pow(&self, exponent: i64) -> Result<Self, CasError> {
        if exponent.abs() > MAX_EXPONENT {
            return Err(CasError::TooLarge(format!("exponent {exponent}")));
        }
        if exponent < 0 {
            return self.recip()?.pow(-exponent);
        }
        if exponent == 0 {
            return Ok(Self::one());
        }
        let power = exponent as u32;
        let factors = self
            .den
            .iter()
            .map(|(f, e)| (f.clone(), e * power))
            .collect();
        Ok(Self::settle(self.num.pow(power), factors))
    }

    /// Rational power with no symbol known to be positive.
    pub fn pow_rational(&self, exponent: &BigRational) -> Result<Self, CasError> {
        self.pow_rational_in(exponent, &Positivity::none())
    }

    /// Rational power. Fractional parts become root atoms. Perfect powers
    /// of constants are taken exactly, and so are powers of symbols in
    /// `positive`.
    pub fn pow_rational_in(
        &self,
        exponent: &BigRational,
        positive: &Positivity,
    ) -> Result<Self, CasError> {
        if exponent.is_integer() {
            let power = exponent
                .to_integer()
                .to_i64()
                .ok_or_else(|| CasError::TooLarge(format!("exponent {exponent}")))?;
            return self.pow(power);
        }
        if self.is_zero() {
            return if exponent.is_positive() {
                Ok(Self::zero())
            } else {
                Err(CasError::DivisionByZero)
            };
        }
        let index = exponent
            .denom()
            .to_u32()
            .filter(|q| *q <= MAX_ROOT_INDEX)
            .ok_or_else(|| CasError::TooLarge(format!("root index {}", exponent.denom())))?;
        let divisor = BigInt::from(index);
        let (whole, remainder) = exponent.numer().div_mod_floor(&divisor);
        let whole = whole
            .to_i64()
            .ok_or_else(|| CasError::TooLarge(format!("exponent {exponent}")))?;
        let remainder = remainder.to_i64().unwrap_or(0);
        let root = self.root(index, positive)?;
        Ok(&self.pow(whole)? * &root.pow(remainder)?)
    }

    /// `self ** (1/index)` using `N/D = (N * D**(index-1))**(1/index) / D`.
    fn root(&self, index: u32, positive: &Positivity) -> Result<Self, CasError> {
        let mut radicand = self.num.clone();
        let mut outside_den = Vec::with_capacity(self.den.len());
        for (factor, exponent) in &self.den {
            radicand = &radicand * &factor.pow(exponent * (index - 1));
            outside_den.push((factor.clone(), *exponent));
        }
        let (coefficient, content, rest) = radicand.primitive_split();
        let (outer, inner) = split_rational_root(&coefficient, index);
        let mut outside = Poly::constant(outer);
        let mut inside = Poly::constant(inner);
        for (atom, exponent) in content.factors() {
            let taken = if positive.covers(atom) { exponent / index } else { 0 };
            let atom = Poly::atom(atom.clone());
            outside = &outside * &atom.pow(taken);
            inside = &inside * &atom.pow(exponent - taken * index);
        }
        inside = &inside * &rest;
        if !inside.is_one() {
            let root = Atom::Root {
                base: inside,
                index,
            };
            outside = &outside * &Poly::atom(root.into_ref());
        }
        Self::from_parts(outside, outside_den)
    }

    /// `base ** exponent` for an arbitrary exponent.
    pub fn power(base: &RatFunc, exponent: &RatFunc) -> Result<Self, CasError> {
        if let Some(value) = exponent.as_constant() {
            return base.pow_rational(&value);
        }
        if base.is_one() {
            return Ok(Self::one());
        }
        if base.is_zero() {
            return Err(CasError::Unsupported(
                "zero raised to a symbolic power".to_string(),
            ));
        }
        if matches!(base.as_atom(), Some(Atom::Symbol(name)) if name == "E") {
            return Self::apply(Function::Exp, exponent.clone());
        }
        Ok(Self::from_atom(
            Atom::Power {
                base: base.clone(),
                exponent: exponent.clone(),
            }
            .into_ref(),
        ))
    }

    /// Apply an elementary function, folding the values it has in closed
    /// form and normalizing the sign of odd and even arguments.
    pub fn apply(function: Function, arg: RatFunc) -> Result<Self, CasError> {
        match function {
            Function::Sin | Function::Sinh => return Ok(Self::angle_pair(&arg, function)?.0),
            Function::Cos | Function::Cosh => return Ok(Self::angle_pair(&arg, function)?.1),
            _ => {}
        }
        if function.is_odd() {
            if arg.is_zero() {
                return Ok(Self::zero());
            }
            if arg.leading_is_negative() {
                return Ok(-&Self::apply(function, -&arg)?);
            }
        } else if function.is_even() {
            if arg.is_zero() {
                return Ok(Self::one());
            }
            if arg.leading_is_negative() {
                return Self::apply(function, -&arg);
            }
        }
        match function {
            Function::Exp => return Self::exp(arg),
            Function::Log => {
                if arg.is_zero() {
                    return Err(CasError::DivisionByZero);
                }
                if arg.is_one() {
                    return Ok(Self::zero());
                }
                if let Some(Atom::Func(Function::Exp, inner)) = arg.as_atom() {
                    return Ok(inner.clone());
                }
            }
            Function::Acos if arg.is_one() => return Ok(Self::zero()),
            _ => {}
        }
        Ok(Self::from_atom(Atom::Func(function, arg).into_ref()))
    }

    /// `(sin(arg), cos(arg))`, or `(sinh(arg), cosh(arg))` for the
    /// hyperbolic functions, expanded over the terms of `arg` with the
    /// addition formulas. A term `(p/q)*m/D` is `p` copies of the angle
    /// `m/(q*D)`, so `sin(2*x)` is `2*sin(x)*cos(x)` and `sin(x + y)` is
    /// written in `sin(x)`, `cos(x)`, `sin(y)` and `cos(y)`.
    fn angle_pair(arg: &RatFunc, function: Function) -> Result<(Self, Self), CasError> {
        let hyperbolic = matches!(function, Function::Sinh | Function::Cosh);
        let (odd, even) = if hyperbolic {
            (Function::Sinh, Function::Cosh)
        } else {
            (Function::Sin, Function::Cos)
        };
        let den: Vec<(Poly, u32)> = arg.den.iter().map(|(f, e)| (f.clone(), *e)).collect();
        let mut pair = (Self::zero(), Self::one());
        for (monomial, coefficient) in arg.num.terms() {
            let multiple = coefficient
                .numer()
                .abs()
                .to_u32()
                .filter(|k| *k <= MAX_ANGLE_MULTIPLE);
            let (mut sine, cosine) = match multiple {
                Some(k) => {
                    let step = BigRational::new(BigInt::one(), coefficient.denom().clone());
                    let unit = Self::from_parts(Poly::term(monomial.clone(), step), den.clone())?;
                    let base = Self::unit_angle(unit, odd, even, hyperbolic);
                    let mut total = base.clone();
                    for _ in 1..k {
                        total = add_angles(&total, &base, hyperbolic);
                    }
                    total
                }
                None => {
                    let angle = Poly::term(monomial.clone(), coefficient.abs());
                    let angle = Self::from_parts(angle, den.clone())?;
                    (
                        Self::from_atom(Atom::Func(odd, angle.clone()).into_ref()),
                        Self::from_atom(Atom::Func(even, angle).into_ref()),
                    )
                }
            };
            if coefficient.is_negative() {
                sine = -&sine;
            }
            pair = add_angles(&pair, &(sine, cosine), hyperbolic);
        }
        Ok(pair)
    }

    /// The pair for a single angle, folding `pi` and `pi/2`.
    fn unit_angle(
        unit: RatFunc,
        odd: Function,
        even: Function,
        hyperbolic: bool,
    ) -> (Self, Self) {
        if !hyperbolic {
            let pi = Self::symbol("pi");
            if unit == pi {
                return (Self::zero(), Self::integer(-1));
            }
            if &unit + &unit == pi {
                return (Self::one(), Self::zero());
            }
        }
        (
            Self::from_atom(Atom::Func(odd, unit.clone()).into_ref()),
            Self::from_atom(Atom::Func(even, unit).into_ref()),
        )
    }

    /// `exp(arg)` as a product over the terms of `arg`. A term `c*m/D`
    /// becomes `exp(m/D)**c`, so exponentials of proportional arguments
    /// share one atom and `exp(a)*exp(b)` equals `exp(a + b)`.
    fn exp(arg: RatFunc) -> Result<Self, CasError> {
        let den: Vec<(Poly, u32)> = arg.den.iter().map(|(f, e)| (f.clone(), *e)).collect();
        let mut product = Self::one();
        for (monomial, coefficient) in arg.num.terms() {
            let unit_num = Poly::term(monomial.clone(), BigRational::one());
            let unit = Self::from_parts(unit_num, den.clone())?;
            let base = match unit.as_atom() {
                Some(Atom::Func(Function::Log, inner)) => inner.clone(),
                _ => Self::from_atom(Atom::Func(Function::Exp, unit).into_ref()),
            };
            product = &product * &base.pow_rational(coefficient)?;
        }
        Ok(product)
    }

    /// Apply a named function. Known names with the wrong number of
    /// arguments are rejected; unknown names become undefined functions.
    pub fn call(name: &str, args: Vec<RatFunc>) -> Result<Self, CasError> {
        Self::call_in(name, args, &Positivity::none())
    }

    fn call_in(name: &str, args: Vec<RatFunc>, positive: &Positivity) -> Result<Self, CasError> {
        let arity_error = |count: usize| {
            CasError::Unsupported(format!("{name} does not take {count} argument(s)"))
        };
        if name == "log" && args.len() == 2 {
            let mut args = args.into_iter();
            let (Some(value), Some(base)) = (args.next(), args.next()) else {
                return Err(arity_error(2));
            };
            let numerator = Self::apply(Function::Log, value)?;
            return numerator.checked_div(&Self::apply(Function::Log, base)?);
        }
        if let Some(function) = Function::from_name(name) {
            return match <[RatFunc; 1]>::try_from(args) {
                Ok([arg]) => Self::apply(function, arg),
                Err(args) => Err(arity_error(args.len())),
            };
        }
        let half = BigRational::new(BigInt::one(), BigInt::from(2));
        match name {
            "tan" | "tanh" | "cot" | "coth" | "sec" | "csc" | "sech" | "csch" | "sqrt" | "Abs"
            | "abs" => {
                let [arg] = <[RatFunc; 1]>::try_from(args).map_err(|a| arity_error(a.len()))?;
                let quotient = |top: Function, bottom: Function| {
                    Self::apply(top, arg.clone())?.checked_div(&Self::apply(bottom, arg.clone())?)
                };
                let reciprocal = |f: Function| Self::apply(f, arg.clone())?.recip();
                match name {
                    "tan" => quotient(Function::Sin, Function::Cos),
                    "tanh" => quotient(Function::Sinh, Function::Cosh),
                    "cot" => quotient(Function::Cos, Function::Sin),
                    "coth" => quotient(Function::Cosh, Function::Sinh),
                    "sec" => reciprocal(Function::Cos),
                    "csc" => reciprocal(Function::Sin),
                    "sech" => reciprocal(Function::Cosh),
                    "csch" => reciprocal(Function::Sinh),
                    // Real arguments: |u| = (u**2)**(1/2).
                    "Abs" | "abs" => (&arg * &arg).pow_rational_in(&half, positive),
                    _ => arg.pow_rational_in(&half, positive),
                }
            }
            "Derivative" => Err(CasError::Unsupported(
                "Derivative requires a target expression".to_string(),
            )),
            _ => {
                let orders = vec![0; args.len()];
                Ok(Self::undefined(name, args, orders))
            }
        }
    }
}

/// Angle addition: `sin(a + b)`, `cos(a + b)` from the pairs of `a` and
/// `b`, or the hyperbolic versions.
fn add_angles(
    a: &(RatFunc, RatFunc),
    b: &(RatFunc, RatFunc),
    hyperbolic: bool,
) -> (RatFunc, RatFunc) {
    let sine = &(&a.0 * &b.1) + &(&a.1 * &b.0);
    let product_of_sines = &a.0 * &b.0;
    let cosine = &a.1 * &b.1;
    let cosine = if hyperbolic {
        &cosine + &product_of_sines
    } else {
        &cosine - &product_of_sines
    };
    (sine, cosine)
}

/// `(outer, inner)` with `value**(1/index) == outer * inner**(1/index)`,
/// taking exact roots of the numerator and denominator when they exist.
fn split_rational_root(value: &BigRational, index: u32) -> (BigRational, BigRational) {
    let magnitude = value.abs();
    let exact = exact_root(magnitude.numer(), index).zip(exact_root(magnitude.denom(), index));
    match exact {
        Some((numer, denom)) => {
            let root = BigRational::new(numer, denom);
            if !value.is_negative() {
                (root, BigRational::one())
            } else if index % 2 == 1 {
                (-root, BigRational::one())
            } else {
                (root, -BigRational::one())
            }
        }
        None => (BigRational::one(), value.clone()),
    }
}

fn exact_root(value: &BigInt, index: u32) -> Option<BigInt> {
    let root = value.nth_root(index);
    (num_traits::pow(root.clone(), index as usize) == *value).then_some(root)
}

impl Add for &RatFunc {
    type Output = RatFunc;

    fn add(self, other: &RatFunc) -> RatFunc {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        if self.den == other.den {
            return RatFunc::cancel(&self.num + &other.num, self.den.clone());
        }
        let mut common = self.den.clone();
        for (factor, exponent) in &other.den {
            let entry = common.entry(factor.clone()).or_insert(0);
            *entry = (*entry).max(*exponent);
        }
        let left = &self.num * &cofactor(&common, &self.den);
        let right = &other.num * &cofactor(&common, &other.den);
        RatFunc::cancel(&left + &right, common)
    }
}

/// Product of the factors of `common` missing from `own`.
fn cofactor(common: &BTreeMap<Poly, u32>, own: &BTreeMap<Poly, u32>) -> Poly {
    let mut product = Poly::one();
    for (factor, exponent) in common {
        let missing = exponent - own.get(factor).copied().unwrap_or(0);
        if missing > 0 {
            product = &product * &factor.pow(missing);
        }
    }
    product
}

impl Sub for &RatFunc {
    type Output = RatFunc;

    fn sub(self, other: &RatFunc) -> RatFunc {
        self + &(-other)
    }
}

impl Mul for &RatFunc {
    type Output = RatFunc;

    fn mul(self, other: &RatFunc) -> RatFunc {
        if self.is_zero() || other.is_zero() {
            return RatFunc::zero();
        }
        let mut factors: Vec<(Poly, u32)> =
            self.den.iter().map(|(f, e)| (f.clone(), *e)).collect();
        factors.extend(other.den.iter().map(|(f, e)| (f.clone(), *e)));
        RatFunc::settle(&self.num * &other.num, factors)
    }
}

impl Neg for &RatFunc {
    type Output = RatFunc;

    fn neg(self) -> RatFunc {
        RatFunc {
            num: -&self.num,
            den: self.den.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion from expressions
// ---------------------------------------------------------------------------

impl RatFunc {
    pub fn from_expr(expr: &Expr) -> Result<Self, CasError> {
        Self::from_expr_in(expr, &Positivity::none())
    }

    /// Normalize `expr`, taking powers of the `positive` symbols out of
    /// roots.
    pub fn from_expr_in(expr: &Expr, positive: &Positivity) -> Result<Self, CasError> {
        match expr {
            Expr::Number(value) => Ok(Self::constant(value.clone())),
            Expr::Symbol(name) => Ok(Self::symbol(name.clone())),
            Expr::Add(terms) => terms.iter().try_fold(Self::zero(), |acc, term| {
                Ok(&acc + &Self::from_expr_in(term, positive)?)
            }),
            Expr::Mul(factors) => factors.iter().try_fold(Self::one(), |acc, factor| {
                Ok(&acc * &Self::from_expr_in(factor, positive)?)
            }),
            Expr::Pow(base, exponent) => Self::from_power(base, exponent, positive),
            Expr::Call(name, args) if name == "Derivative" => Self::from_derivative(args, positive),
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| Self::from_expr_in(arg, positive))
                    .collect::<Result<Vec<_>, _>>()?;
                Self::call_in(name, args, positive)
            }
        }
    }

    fn from_power(base: &Expr, exponent: &Expr, positive: &Positivity) -> Result<Self, CasError> {
        let Some(power) = exponent.as_number() else {
            let exponent = Self::from_expr_in(exponent, positive)?;
            return Self::power(&Self::from_expr_in(base, positive)?, &exponent);
        };
        if power.is_integer() {
            match base {
                Expr::Pow(inner_base, inner_exponent) => {
                    if let Some(inner) = inner_exponent.as_number().filter(|k| k.is_integer()) {
                        let combined = Expr::Number(inner * power);
                        return Self::from_power(inner_base, &combined, positive);
                    }
                }
                // Negative powers of products distribute, so a printed
                // denominator reparses to the same factor list.
                Expr::Mul(factors) if power.is_negative() => {
                    return factors.iter().try_fold(Self::one(), |acc, factor| {
                        Ok(&acc * &Self::from_power(factor, exponent, positive)?)
                    });
                }
                _ => {}
            }
        }
        Self::from_expr_in(base, positive)?.pow_rational_in(power, positive)
    }

    /// `Derivative(target, v1, v2, ...)`. Symbol variables differentiate;
    /// non-negative integers name an argument slot of an undefined function.
    fn from_derivative(args: &[Expr], positive: &Positivity) -> Result<Self, CasError> {
        let Some((target, variables)) = args.split_first() else {
            return Err(CasError::Unsupported(
                "Derivative requires a target expression".to_string(),
            ));
        };
        if variables.is_empty() {
            return Err(CasError::Unsupported(
                "Derivative requires at least one variable".to_string(),
            ));
        }
        let mut result = Self::from_expr_in(target, positive)?;
        for variable in variables {
            result = match variable {
                Expr::Symbol(name) => result.diff(name)?,
                Expr::Number(slot) if slot.is_integer() && !slot.is_negative() => {
                    result.diff_slot(slot)?
                }
                other => {
                    return Err(CasError::Unsupported(format!(
                        "cannot differentiate with respect to {other}"
                    )))
                }
            };
        }
        Ok(result)
    }

    fn diff_slot(&self, slot: &BigRational) -> Result<Self, CasError> {
        let Some(Atom::Undefined { name, args, orders }) = self.as_atom() else {
            return Err(CasError::Unsupported(format!(
                "slot derivative of {self}"
            )));
        };
        let index = slot
            .to_integer()
            .to_usize()
            .filter(|i| *i < args.len())
            .ok_or_else(|| CasError::Unsupported(format!("{name} has no argument slot {slot}")))?;
        let mut orders = orders.clone();
        orders[index] += 1;
        Ok(Self::undefined(name.clone(), args.clone(), orders))
    }
}

// ---------------------------------------------------------------------------
// Calculus and substitution
// ---------------------------------------------------------------------------

impl RatFunc {
    /// Derivative with respect to the symbol `var`.
    pub fn diff(&self, var: &str) -> Result<Self, CasError> {
        if !self.depends_on(var) {
            return Ok(Self::zero());
        }
        let mut cache = HashMap::new();
        let num_derivative = poly_diff(&self.num, var, &mut cache)?;
        if self.den.is_empty() {
            return Ok(num_derivative);
        }
        let inverse_den = Self {
            num: Poly::one(),
            den: self.den.clone(),
        };
        let mut log_derivative = Self::zero();
        for (factor, exponent) in &self.den {
            let derivative = poly_diff(factor, var, &mut cache)?;
            if derivative.is_zero() {
                continue;
            }
            let scaled = &derivative * &Self::integer(i64::from(*exponent));
            log_derivative =
                &log_derivative + &scaled.checked_div(&Self::from_poly(factor.clone()))?;
        }
        Ok(&(&num_derivative * &inverse_den) - &(self * &log_derivative))
    }

    /// Replace symbols by values. Symbols without a value are kept.
    pub fn substitute(&self, values: &BTreeMap<String, RatFunc>) -> Result<Self, CasError> {
        if !self
            .free_symbols()
            .iter()
            .any(|name| values.contains_key(name))
        {
            return Ok(self.clone());
        }
        let mut cache = HashMap::new();
        let mut result = substitute_poly(&self.num, values, &mut cache)?;
        for (factor, exponent) in &self.den {
            let value = substitute_poly(factor, values, &mut cache)?;
            result = result.checked_div(&value.pow(i64::from(*exponent))?)?;
        }
        Ok(result)
    }

    /// Numeric value under `env`.
    pub fn eval(&self, env: &Environment) -> Result<f64, EvalError> {
        self.to_expr().eval(env)
    }
}

fn poly_diff(
    poly: &Poly,
    var: &str,
    cache: &mut HashMap<AtomRef, RatFunc>,
) -> Result<RatFunc, CasError> {
    let mut total = RatFunc::zero();
    for atom in poly.atoms() {
        if !atom.depends_on(var) {
            continue;
        }
        let derivative = match cache.get(&atom) {
            Some(known) => known.clone(),
            None => {
                let computed = atom.derivative(var)?;
                cache.insert(atom.clone(), computed.clone());
                computed
            }
        };
        if derivative.is_zero() {
            continue;
        }
        total = &total + &(&RatFunc::from_poly(poly.partial(&atom)) * &derivative);
    }
    Ok(total)
}

fn substitute_poly(
    poly: &Poly,
    values: &BTreeMap<String, RatFunc>,
    cache: &mut HashMap<AtomRef, RatFunc>,
) -> Result<RatFunc, CasError> {
    let mut total = RatFunc::zero();
    for (monomial, coefficient) in poly.terms() {
        let mut term = RatFunc::constant(coefficient.clone());
        for (atom, exponent) in monomial.factors() {
            let value = match cache.get(atom) {
                Some(known) => known.clone(),
                None => {
                    let computed = atom.substitute(values)?;
                    cache.insert(atom.clone(), computed.clone());
                    computed
                }
            };
            term = &term * &value.pow(i64::from(*exponent))?;
        }
        total = &total + &term;
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Output forms
// ---------------------------------------------------------------------------

impl RatFunc {
    /// Normal form: expanded numerator over the product of factors.
    pub fn to_expr(&self) -> Expr {
        self.over_denominator(self.num.to_expr(), None)
    }

    /// Single fraction with an integer-coefficient numerator.
    pub fn together_expr(&self) -> Expr {
        let scale = self.num.denominator_lcm();
        if scale.is_one() {
            return self.to_expr();
        }
        let scale = BigRational::from_integer(scale);
        let numerator = self.num.scale(&scale).to_expr();
        self.over_denominator(numerator, Some(scale))
    }

    /// Numerator with its rational and monomial content pulled out.
    pub fn factor_expr(&self) -> Expr {
        if self.num.is_zero() {
            return Expr::integer(0);
        }
        let (coefficient, content, rest) = self.num.primitive_split();
        let mut factors = Vec::with_capacity(3);
        if !coefficient.is_one() {
            factors.push(Expr::Number(coefficient));
        }
        if !content.is_one() {
            factors.push(content.to_expr());
        }
        if !rest.is_one() {
            factors.push(rest.to_expr());
        }
        self.over_denominator(Expr::product(factors), None)
    }

    fn over_denominator(&self, numerator: Expr, scale: Option<BigRational>) -> Expr {
        if self.den.is_empty() && scale.is_none() {
            return numerator;
        }
        let mut divisor = Vec::with_capacity(self.den.len() + 1);
        if let Some(scale) = scale {
            divisor.push(Expr::Number(scale));
        }
        divisor.extend(self.den.iter().map(|(factor, exponent)| match factor.as_atom() {
            Some(atom) => atom.power_expr(*exponent),
            None if *exponent == 1 => factor.to_expr(),
            None => Expr::pow(factor.to_expr(), Expr::integer(i64::from(*exponent))),
        }));
        let reciprocal = Expr::pow(Expr::product(divisor), Expr::integer(-1));
        if numerator == Expr::integer(1) {
            reciprocal
        } else {
            Expr::product(vec![numerator, reciprocal])
        }
    }
}

impl fmt::Display for RatFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_expr())
    }
}
