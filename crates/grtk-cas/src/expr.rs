//! # Expression Trees
//!
//! [`Expr`] is the tagged syntax tree produced by the parser and consumed by
//! the normal form, the numeric evaluator and the unit checker. Subtraction,
//! division and negation do not have their own variants: `a - b` is
//! `Add[a, Mul[-1, b]]` and `a / b` is `Mul[a, Pow(b, -1)]`.
//!
//! ## Printing
//!
//! `Display` writes a form the parser reads back: `**` for powers, quotients
//! as `numerator/denominator`, negative terms as ` - `. Printing a parsed
//! tree and parsing it again yields a tree that prints identically.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::CasError;

/// A symbolic expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
    /// Exact rational constant.
    Number(BigRational),
    /// Named symbol.
    Symbol(String),
    /// Sum of two or more terms.
    Add(Vec<Expr>),
    /// Product of two or more factors.
    Mul(Vec<Expr>),
    /// `base ** exponent`.
    Pow(Box<Expr>, Box<Expr>),
    /// Function application, e.g. `sin(x)` or `a(t)`.
    Call(String, Vec<Expr>),
}

impl Expr {
    pub fn integer(value: i64) -> Self {
        Self::Number(BigRational::from_integer(BigInt::from(value)))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Call(name.into(), args)
    }

    pub fn pow(base: Expr, exponent: Expr) -> Self {
        Self::Pow(Box::new(base), Box::new(exponent))
    }

    /// Parse infix text.
    pub fn parse(text: &str) -> Result<Self, CasError> {
        crate::parser::parse(text)
    }

    /// Sum with nested sums flattened. An empty sum is `0`.
    pub fn sum(terms: Vec<Expr>) -> Self {
        let mut flat = Vec::with_capacity(terms.len());
        for term in terms {
            match term {
                Self::Add(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::integer(0),
            1 => flat.remove(0),
            _ => Self::Add(flat),
        }
    }

    /// Product with nested products flattened. An empty product is `1`.
    pub fn product(factors: Vec<Expr>) -> Self {
        let mut flat = Vec::with_capacity(factors.len());
        for factor in factors {
            match factor {
                Self::Mul(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::integer(1),
            1 => flat.remove(0),
            _ => Self::Mul(flat),
        }
    }

    /// Arithmetic negation.
    pub fn negate(self) -> Self {
        match self {
            Self::Number(value) => Self::Number(-value),
            Self::Mul(factors) => {
                let mut negated = Vec::with_capacity(factors.len() + 1);
                negated.push(Self::integer(-1));
                negated.extend(factors);
                Self::Mul(negated)
            }
            other => Self::Mul(vec![Self::integer(-1), other]),
        }
    }

    pub fn as_number(&self) -> Option<&BigRational> {
        match self {
            Self::Number(value) => Some(value),
            _ => None,
        }
    }

    /// Every symbol name occurring in the tree. Function names are not
    /// symbols.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_symbols(&mut names);
        names
    }

    fn collect_symbols(&self, names: &mut BTreeSet<String>) {
        match self {
            Self::Number(_) => {}
            Self::Symbol(name) => {
                names.insert(name.clone());
            }
            Self::Add(items) | Self::Mul(items) | Self::Call(_, items) => {
                for item in items {
                    item.collect_symbols(names);
                }
            }
            Self::Pow(base, exponent) => {
                base.collect_symbols(names);
                exponent.collect_symbols(names);
            }
        }
    }
}

impl FromStr for Expr {
    type Err = CasError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self).text)
    }
}

// ---------------------------------------------------------------------------
// Printer
// ---------------------------------------------------------------------------

const PREC_SUM: u8 = 1;
const PREC_PRODUCT: u8 = 2;
const PREC_POWER: u8 = 3;
const PREC_ATOM: u8 = 4;

/// Largest integer exponent folded into a numeric coefficient when printing.
const MAX_FOLDED_EXPONENT: i64 = 64;

struct Rendered {
    text: String,
    prec: u8,
}

impl Rendered {
    fn new(text: String, prec: u8) -> Self {
        Self { text, prec }
    }

    fn wrapped_if(self, wrap: bool) -> String {
        if wrap {
            format!("({})", self.text)
        } else {
            self.text
        }
    }
}

fn render(expr: &Expr) -> Rendered {
    match expr {
        Expr::Number(value) => render_number(value),
        Expr::Symbol(name) => Rendered::new(name.clone(), PREC_ATOM),
        Expr::Call(name, args) => {
            let args: Vec<String> = args.iter().map(|arg| render(arg).text).collect();
            Rendered::new(format!("{}({})", name, args.join(", ")), PREC_ATOM)
        }
        Expr::Pow(base, exponent) => {
            if is_negative_number(exponent) || numeric_value(expr).is_some() {
                return render_product(std::slice::from_ref(expr));
            }
            let base = render(base);
            let base_wrap = base.prec <= PREC_POWER;
            let exponent = render(exponent);
            let exponent_wrap = exponent.prec < PREC_POWER;
            Rendered::new(
                format!(
                    "{}**{}",
                    base.wrapped_if(base_wrap),
                    exponent.wrapped_if(exponent_wrap)
                ),
                PREC_POWER,
            )
        }
        Expr::Add(terms) => render_sum(terms),
        Expr::Mul(factors) => render_product(factors),
    }
}

fn render_number(value: &BigRational) -> Rendered {
    if value.is_integer() {
        let prec = if value.is_negative() {
            PREC_PRODUCT
        } else {
            PREC_ATOM
        };
        Rendered::new(value.numer().to_string(), prec)
    } else {
        Rendered::new(
            format!("{}/{}", value.numer(), value.denom()),
            PREC_PRODUCT,
        )
    }
}

fn render_sum(terms: &[Expr]) -> Rendered {
    match terms {
        [] => return Rendered::new("0".to_string(), PREC_ATOM),
        [single] => return render(single),
        _ => {}
    }
    let mut text = String::new();
    for (position, term) in terms.iter().enumerate() {
        if position == 0 {
            text.push_str(&render(term).text);
        } else if let Some(positive) = negated_term(term) {
            let rendered = render(&positive);
            let wrap = rendered.prec <= PREC_SUM;
            text.push_str(" - ");
            text.push_str(&rendered.wrapped_if(wrap));
        } else {
            text.push_str(" + ");
            text.push_str(&render(term).text);
        }
    }
    Rendered::new(text, PREC_SUM)
}

fn render_product(factors: &[Expr]) -> Rendered {
    let (coefficient, rest) = split_coefficient(factors);
    let mut numer: Vec<Rendered> = Vec::new();
    let mut denom: Vec<Rendered> = Vec::new();
    for factor in rest {
        match factor {
            Expr::Pow(base, exponent) if is_negative_number(exponent) => {
                let positive = exponent.as_number().map(|e| -e).unwrap_or_else(BigRational::one);
                let divisor = if positive.is_one() {
                    (**base).clone()
                } else {
                    Expr::Pow(base.clone(), Box::new(Expr::Number(positive)))
                };
                denom.push(render(&divisor));
            }
            other => numer.push(render(other)),
        }
    }

    let negative = coefficient.is_negative();
    let magnitude = coefficient.abs();
    if !magnitude.denom().is_one() {
        denom.insert(0, Rendered::new(magnitude.denom().to_string(), PREC_ATOM));
    }
    if !magnitude.numer().is_one() {
        numer.insert(0, Rendered::new(magnitude.numer().to_string(), PREC_ATOM));
    }

    if !negative && denom.is_empty() && numer.len() == 1 {
        if let Some(single) = numer.pop() {
            return single;
        }
    }

    let numer_text = if numer.is_empty() {
        "1".to_string()
    } else {
        let single = numer.len() == 1 && denom.is_empty();
        numer
            .into_iter()
            .map(|part| {
                let wrap = if single {
                    part.prec <= PREC_SUM
                } else {
                    part.prec <= PREC_PRODUCT
                };
                part.wrapped_if(wrap)
            })
            .collect::<Vec<_>>()
            .join("*")
    };

    let mut text = String::new();
    if negative {
        text.push('-');
    }
    text.push_str(&numer_text);
    if !denom.is_empty() {
        text.push('/');
        if denom.len() == 1 {
            let part = denom.remove(0);
            let wrap = part.prec < PREC_POWER;
            text.push_str(&part.wrapped_if(wrap));
        } else {
            let joined = denom
                .into_iter()
                .map(|part| {
                    let wrap = part.prec <= PREC_PRODUCT;
                    part.wrapped_if(wrap)
                })
                .collect::<Vec<_>>()
                .join("*");
            text.push('(');
            text.push_str(&joined);
            text.push(')');
        }
    }
    Rendered::new(text, PREC_PRODUCT)
}

/// Value of a numeric factor: a number, or a number raised to a small
/// integer power.
fn numeric_value(expr: &Expr) -> Option<BigRational> {
    match expr {
        Expr::Number(value) => Some(value.clone()),
        Expr::Pow(base, exponent) => {
            let base = base.as_number()?;
            let exponent = exponent.as_number()?;
            if !exponent.is_integer() {
                return None;
            }
            let power = exponent.to_integer().to_i64()?;
            if power.abs() > MAX_FOLDED_EXPONENT || (base.is_zero() && power < 0) {
                return None;
            }
            let magnitude = num_traits::pow(base.clone(), power.unsigned_abs() as usize);
            if power < 0 {
                Some(magnitude.recip())
            } else {
                Some(magnitude)
            }
        }
        _ => None,
    }
}

fn split_coefficient(factors: &[Expr]) -> (BigRational, Vec<&Expr>) {
    let mut coefficient = BigRational::one();
    let mut rest = Vec::with_capacity(factors.len());
    for factor in factors {
        match numeric_value(factor) {
            Some(value) => coefficient *= value,
            None => rest.push(factor),
        }
    }
    (coefficient, rest)
}

fn is_negative_number(expr: &Expr) -> bool {
    expr.as_number().is_some_and(|value| value.is_negative())
}

/// The negation of `term` when the term prints with a leading minus.
fn negated_term(term: &Expr) -> Option<Expr> {
    match term {
        Expr::Number(value) if value.is_negative() => Some(Expr::Number(-value)),
        Expr::Mul(factors) => {
            let (coefficient, rest) = split_coefficient(factors);
            if !coefficient.is_negative() {
                return None;
            }
            let positive = -coefficient;
            let mut negated = Vec::with_capacity(rest.len() + 1);
            if !positive.is_one() {
                negated.push(Expr::Number(positive));
            }
            negated.extend(rest.into_iter().cloned());
            Some(Expr::product(negated))
        }
        _ => None,
    }
}
