//! # Positivity
//!
//! Symbols declared positive. Taking `x` out of `sqrt(x**2)` is only valid
//! when `x` is positive, so roots keep such powers inside unless the symbol
//! is listed here.

use std::collections::BTreeSet;

use crate::atom::Atom;

/// Names of symbols known to be positive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Positivity(BTreeSet<String>);

impl Positivity {
    /// No symbol is known to be positive.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.0.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `atom` is a symbol declared positive.
    pub fn covers(&self, atom: &Atom) -> bool {
        matches!(atom, Atom::Symbol(name) if self.contains(name))
    }
}
