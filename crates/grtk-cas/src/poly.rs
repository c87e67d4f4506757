//! # Multivariate Polynomials over ℚ
//!
//! Polynomials whose variables are [`Atom`]s. Terms live in a `BTreeMap`
//! keyed by [`Monomial`] under a lexicographic monomial order, so the
//! leading term is the last entry.
//!
//! ## Reduction
//!
//! Products are reduced by the atom rewrite rules (`cos(u)**2 → 1 -
//! sin(u)**2`, `cosh(u)**2 → 1 + sinh(u)**2`, `root(b, q)**q → b`). A
//! reduced polynomial is zero exactly when the function it denotes is zero
//! on the supported algebra, which is what makes the zero test exact.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Add, Mul, Neg, Sub};

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::atom::{Atom, AtomRef};
use crate::expr::Expr;

/// Step limit for exact division. Division that does not finish within the
/// limit is reported as "not divisible".
const MAX_DIVISION_STEPS: usize = 4096;

// ---------------------------------------------------------------------------
// Monomial
// ---------------------------------------------------------------------------

/// Product of atom powers, sorted by atom with positive exponents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Monomial(Vec<(AtomRef, u32)>);

impl Monomial {
    pub fn one() -> Self {
        Self(Vec::new())
    }

    pub fn atom(atom: AtomRef, exponent: u32) -> Self {
        if exponent == 0 {
            Self::one()
        } else {
            Self(vec![(atom, exponent)])
        }
    }

    pub fn is_one(&self) -> bool {
        self.0.is_empty()
    }

    pub fn factors(&self) -> &[(AtomRef, u32)] {
        &self.0
    }

    /// Exponent of `atom` in this monomial.
    pub fn power_of(&self, atom: &Atom) -> u32 {
        self.0
            .iter()
            .find(|(a, _)| a.as_ref() == atom)
            .map_or(0, |(_, e)| *e)
    }

    pub fn times(&self, other: &Monomial) -> Monomial {
        let mut merged = Vec::with_capacity(self.0.len() + other.0.len());
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() && j < other.0.len() {
            let (a, ea) = &self.0[i];
            let (b, eb) = &other.0[j];
            match a.cmp(b) {
                Ordering::Less => {
                    merged.push((a.clone(), *ea));
                    i += 1;
                }
                Ordering::Greater => {
                    merged.push((b.clone(), *eb));
                    j += 1;
                }
                Ordering::Equal => {
                    merged.push((a.clone(), ea + eb));
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&self.0[i..]);
        merged.extend_from_slice(&other.0[j..]);
        Monomial(merged)
    }

    /// `self / other` when every exponent of `other` fits.
    pub fn checked_div(&self, other: &Monomial) -> Option<Monomial> {
        let mut quotient = Vec::with_capacity(self.0.len());
        let mut j = 0;
        for (atom, exponent) in &self.0 {
            if j < other.0.len() && other.0[j].0 == *atom {
                let divisor = other.0[j].1;
                if divisor > *exponent {
                    return None;
                }
                if *exponent > divisor {
                    quotient.push((atom.clone(), exponent - divisor));
                }
                j += 1;
            } else if j < other.0.len() && other.0[j].0 < *atom {
                return None;
            } else {
                quotient.push((atom.clone(), *exponent));
            }
        }
        if j < other.0.len() {
            return None;
        }
        Some(Monomial(quotient))
    }

    /// Common atoms with their minimum exponents.
    pub fn gcd(&self, other: &Monomial) -> Monomial {
        Monomial(
            self.0
                .iter()
                .filter_map(|(atom, e)| {
                    let shared = other.power_of(atom).min(*e);
                    (shared > 0).then(|| (atom.clone(), shared))
                })
                .collect(),
        )
    }

    /// Expression form, coefficient not included.
    pub fn to_expr(&self) -> Expr {
        Expr::product(
            self.0
                .iter()
                .map(|(atom, exponent)| atom.power_expr(*exponent))
                .collect(),
        )
    }
}

impl PartialOrd for Monomial {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic order: the smallest atom is the most significant variable.
impl Ord for Monomial {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut left = self.0.iter();
        let mut right = other.0.iter();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return Ordering::Equal,
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (Some((a, ea)), Some((b, eb))) => match a.cmp(b) {
                    Ordering::Equal => match ea.cmp(eb) {
                        Ordering::Equal => continue,
                        unequal => return unequal,
                    },
                    Ordering::Less => return Ordering::Greater,
                    Ordering::Greater => return Ordering::Less,
                },
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Poly
// ---------------------------------------------------------------------------

/// Sparse polynomial with exact rational coefficients.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Poly {
    terms: BTreeMap<Monomial, BigRational>,
}

impl Poly {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::constant(BigRational::one())
    }

    pub fn constant(value: BigRational) -> Self {
        Self::term(Monomial::one(), value)
    }

    pub fn integer(value: i64) -> Self {
        Self::constant(BigRational::from_integer(BigInt::from(value)))
    }

    /// The polynomial consisting of a single atom.
    pub fn atom(atom: AtomRef) -> Self {
        Self::term(Monomial::atom(atom, 1), BigRational::one())
    }

    pub fn term(monomial: Monomial, coefficient: BigRational) -> Self {
        let mut poly = Self::zero();
        poly.add_term(monomial, coefficient);
        poly
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_one(&self) -> bool {
        self.as_constant().is_some_and(|c| c.is_one())
    }

    /// The value of a constant polynomial.
    pub fn as_constant(&self) -> Option<BigRational> {
        match self.terms.len() {
            0 => Some(BigRational::zero()),
            1 => self
                .terms
                .get(&Monomial::one())
                .cloned(),
            _ => None,
        }
    }

    /// The atom, when the polynomial is exactly one atom to the first power.
    pub fn as_atom(&self) -> Option<&AtomRef> {
        if self.terms.len() != 1 {
            return None;
        }
        let (monomial, coefficient) = self.terms.iter().next()?;
        match monomial.factors() {
            [(atom, 1)] if coefficient.is_one() => Some(atom),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> impl DoubleEndedIterator<Item = (&Monomial, &BigRational)> {
        self.terms.iter()
    }

    pub fn leading(&self) -> Option<(&Monomial, &BigRational)> {
        self.terms.iter().next_back()
    }

    /// Sign of the leading coefficient is negative.
    pub fn leading_is_negative(&self) -> bool {
        self.leading().is_some_and(|(_, c)| c.is_negative())
    }

    pub fn add_term(&mut self, monomial: Monomial, coefficient: BigRational) {
        if coefficient.is_zero() {
            return;
        }
        match self.terms.get_mut(&monomial) {
            Some(existing) => {
                *existing += coefficient;
                if existing.is_zero() {
                    self.terms.remove(&monomial);
                }
            }
            None => {
                self.terms.insert(monomial, coefficient);
            }
        }
    }

    pub fn scale(&self, factor: &BigRational) -> Poly {
        if factor.is_zero() {
            return Poly::zero();
        }
        Poly {
            terms: self
                .terms
                .iter()
                .map(|(m, c)| (m.clone(), c * factor))
                .collect(),
        }
    }

    /// Product without applying the rewrite rules.
    fn raw_mul(&self, other: &Poly) -> Poly {
        let mut product = Poly::zero();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &other.terms {
                product.add_term(ma.times(mb), ca * cb);
            }
        }
        product
    }

    pub fn pow(&self, exponent: u32) -> Poly {
        let mut result = Poly::one();
        let mut base = self.clone();
        let mut remaining = exponent;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = &result * &base;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = &base * &base;
            }
        }
        result
    }

    /// Apply the atom rewrite rules until no term is reducible.
    pub fn reduce(self) -> Poly {
        if !self.terms.keys().any(needs_reduction) {
            return self;
        }
        let mut reduced = Poly::zero();
        for (monomial, coefficient) in self.terms {
            match reduce_monomial(&monomial) {
                None => reduced.add_term(monomial, coefficient),
                Some(replacement) => {
                    for (m, c) in replacement.terms {
                        reduced.add_term(m, c * &coefficient);
                    }
                }
            }
        }
        reduced
    }

    /// Every atom that occurs in some term.
    pub fn atoms(&self) -> BTreeSet<AtomRef> {
        self.terms
            .keys()
            .flat_map(|m| m.factors().iter().map(|(a, _)| a.clone()))
            .collect()
    }

    /// Smallest exponent of `atom` over all terms.
    pub fn min_power(&self, atom: &Atom) -> u32 {
        self.terms
            .keys()
            .map(|m| m.power_of(atom))
            .min()
            .unwrap_or(0)
    }

    /// Largest monomial dividing every term.
    pub fn monomial_content(&self) -> Monomial {
        let mut keys = self.terms.keys();
        let Some(first) = keys.next() else {
            return Monomial::one();
        };
        keys.fold(first.clone(), |acc, m| acc.gcd(m))
    }

    /// Divide every term by `monomial`, `None` if some term is not divisible.
    pub fn div_monomial(&self, monomial: &Monomial) -> Option<Poly> {
        if monomial.is_one() {
            return Some(self.clone());
        }
        let mut quotient = BTreeMap::new();
        for (m, c) in &self.terms {
            quotient.insert(m.checked_div(monomial)?, c.clone());
        }
        Some(Poly { terms: quotient })
    }

    /// Positive rational content: gcd of numerators over lcm of denominators.
    pub fn rational_content(&self) -> BigRational {
        let mut numer = BigInt::zero();
        let mut denom = BigInt::one();
        for c in self.terms.values() {
            numer = numer.gcd(c.numer());
            denom = denom.lcm(c.denom());
        }
        if numer.is_zero() {
            return BigRational::one();
        }
        BigRational::new(numer, denom)
    }

    /// Least common multiple of the coefficient denominators.
    pub fn denominator_lcm(&self) -> BigInt {
        self.terms
            .values()
            .fold(BigInt::one(), |acc, c| acc.lcm(c.denom()))
    }

    /// Split into `coefficient * monomial * rest` where `rest` has integer
    /// coefficients with gcd 1, a positive leading coefficient, and no
    /// monomial content.
    pub fn primitive_split(&self) -> (BigRational, Monomial, Poly) {
        if self.is_zero() {
            return (BigRational::zero(), Monomial::one(), Poly::zero());
        }
        let content = self.monomial_content();
        let Some(stripped) = self.div_monomial(&content) else {
            return (BigRational::one(), Monomial::one(), self.clone());
        };
        let mut coefficient = stripped.rational_content();
        if stripped.leading_is_negative() {
            coefficient = -coefficient;
        }
        let rest = stripped.scale(&coefficient.recip());
        (coefficient, content, rest)
    }

    /// Exact quotient `self / divisor`, or `None` when the leading-term
    /// division leaves a remainder.
    pub fn exact_div(&self, divisor: &Poly) -> Option<Poly> {
        let (lead_monomial, lead_coefficient) = divisor.leading()?;
        let mut remainder = self.clone();
        let mut quotient = Poly::zero();
        let mut steps = 0;
        while let Some((monomial, coefficient)) = remainder.leading() {
            steps += 1;
            if steps > MAX_DIVISION_STEPS {
                return None;
            }
            let factor = Poly::term(
                monomial.checked_div(lead_monomial)?,
                coefficient / lead_coefficient,
            );
            remainder = &remainder - &(&factor * divisor);
            quotient = &quotient + &factor;
        }
        Some(quotient)
    }

    /// Formal partial derivative with respect to one atom.
    pub fn partial(&self, atom: &Atom) -> Poly {
        let mut result = Poly::zero();
        for (monomial, coefficient) in &self.terms {
            let exponent = monomial.power_of(atom);
            if exponent == 0 {
                continue;
            }
            let lowered: Vec<(AtomRef, u32)> = monomial
                .factors()
                .iter()
                .filter_map(|(a, e)| {
                    if a.as_ref() == atom {
                        (*e > 1).then(|| (a.clone(), e - 1))
                    } else {
                        Some((a.clone(), *e))
                    }
                })
                .collect();
            result.add_term(
                Monomial(lowered),
                coefficient * BigRational::from_integer(BigInt::from(exponent)),
            );
        }
        result
    }

    /// Expression form, leading term first.
    pub fn to_expr(&self) -> Expr {
        let terms: Vec<Expr> = self
            .terms
            .iter()
            .rev()
            .map(|(monomial, coefficient)| term_expr(monomial, coefficient))
            .collect();
        Expr::sum(terms)
    }
}

fn term_expr(monomial: &Monomial, coefficient: &BigRational) -> Expr {
    if monomial.is_one() {
        return Expr::Number(coefficient.clone());
    }
    let mut factors = Vec::with_capacity(monomial.factors().len() + 1);
    if !coefficient.is_one() {
        factors.push(Expr::Number(coefficient.clone()));
    }
    factors.extend(
        monomial
            .factors()
            .iter()
            .map(|(atom, exponent)| atom.power_expr(*exponent)),
    );
    Expr::product(factors)
}

fn needs_reduction(monomial: &Monomial) -> bool {
    monomial
        .factors()
        .iter()
        .any(|(atom, e)| atom.reduction_period().is_some_and(|period| *e >= period))
}

fn reduce_monomial(monomial: &Monomial) -> Option<Poly> {
    let mut kept = Vec::with_capacity(monomial.factors().len());
    let mut replacements = Vec::new();
    for (atom, exponent) in monomial.factors() {
        match atom.reduction() {
            Some((period, replacement)) if *exponent >= period => {
                if exponent % period > 0 {
                    kept.push((atom.clone(), exponent % period));
                }
                replacements.push((replacement, exponent / period));
            }
            _ => kept.push((atom.clone(), *exponent)),
        }
    }
    if replacements.is_empty() {
        return None;
    }
    let mut result = Poly::term(Monomial(kept), BigRational::one());
    for (replacement, power) in replacements {
        result = &result * &replacement.pow(power);
    }
    Some(result)
}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, other: &Poly) -> Poly {
        let mut sum = self.clone();
        for (m, c) in &other.terms {
            sum.add_term(m.clone(), c.clone());
        }
        sum
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, other: &Poly) -> Poly {
        let mut difference = self.clone();
        for (m, c) in &other.terms {
            difference.add_term(m.clone(), -c);
        }
        difference
    }
}

impl Mul for &Poly {
    type Output = Poly;

    fn mul(self, other: &Poly) -> Poly {
        self.raw_mul(other).reduce()
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        Poly {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), -c)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn x() -> Poly {
        Poly::atom(Atom::symbol("x"))
    }

    fn y() -> Poly {
        Poly::atom(Atom::symbol("y"))
    }

    fn int(n: i64) -> Poly {
        Poly::integer(n)
    }

    #[test]
    fn multiplication_expands() {
        let a = &x() + &int(1);
        let b = &x() - &int(1);
        let product = &a * &b;
        let expected = &(&x() * &x()) - &int(1);
        assert_eq!(product, expected);
    }

    #[test]
    fn leading_term_uses_lex_order() {
        let p = &(&x() * &y()) + &(&y() * &(&y() * &y()));
        let (lead, _) = p.leading().unwrap();
        assert_eq!(lead.power_of(&Atom::Symbol("x".into())), 1);
    }

    #[test]
    fn exact_division_succeeds_and_fails() {
        let dividend = &(&x() * &x()) - &int(1);
        let divisor = &x() + &int(1);
        assert_eq!(dividend.exact_div(&divisor), Some(&x() - &int(1)));
        let other = &x() + &int(2);
        assert_eq!(dividend.exact_div(&other), None);
    }

    #[test]
    fn primitive_split_extracts_content() {
        let p = &(&x() * &y()).scale(&BigRational::new(BigInt::from(-4), BigInt::from(3)))
            + &x().scale(&BigRational::new(BigInt::from(2), BigInt::from(3)));
        let (coefficient, content, rest) = p.primitive_split();
        assert_eq!(coefficient, BigRational::new(BigInt::from(-2), BigInt::from(3)));
        assert_eq!(content, Monomial::atom(Atom::symbol("x"), 1));
        assert_eq!(rest, &y().scale(&BigRational::from_integer(BigInt::from(2))) - &int(1));
    }

    #[test]
    fn pythagorean_reduction_applies_to_products() {
        let theta = crate::RatFunc::symbol("theta");
        let sin = Poly::atom(Arc::new(Atom::Func(crate::Function::Sin, theta.clone())));
        let cos = Poly::atom(Arc::new(Atom::Func(crate::Function::Cos, theta)));
        let identity = &(&sin * &sin) + &(&cos * &cos);
        assert_eq!(identity, Poly::one());
    }

    #[test]
    fn partial_derivative_lowers_exponent() {
        let p = &(&x() * &x()) * &y();
        let dp = p.partial(&Atom::Symbol("x".into()));
        assert_eq!(dp, (&x() * &y()).scale(&BigRational::from_integer(BigInt::from(2))));
    }

    #[test]
    fn prints_descending() {
        let p = &(&(&x() * &x()) + &x().scale(&BigRational::from_integer(BigInt::from(2)))) + &int(1);
        assert_eq!(p.to_expr().to_string(), "x**2 + 2*x + 1");
    }
}
