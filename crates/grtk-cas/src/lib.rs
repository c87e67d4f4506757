//! # grtk-cas — Symbolic Capability
//!
//! The computer-algebra layer of the GR tensor toolkit. Everything above it
//! (metric parsing, tensor computation, checks) manipulates expressions only
//! through this crate.
//!
//! ## Layers
//!
//! - [`expr`] / [`parser`]: infix text ↔ [`Expr`] trees. Printing is
//!   parseable and stable under reparse.
//! - [`poly`] / [`atom`]: multivariate polynomials over ℚ whose variables
//!   are symbols and function applications, reduced by the Pythagorean and
//!   root rewrite rules.
//! - [`ratfunc`]: the canonical rational-function normal form with exact
//!   zero test, differentiation and substitution.
//! - [`simplify`]: tiered, never-failing simplification of text.
//! - [`eval`]: numeric evaluation to `f64`.
//! - [`matrix`]: exact inversion of symbolic matrices.
//! - [`positivity`]: symbols whose powers may leave a root.
//!
//! ## Crate Policy
//!
//! - Symbolic errors are [`CasError`]; numeric errors are [`EvalError`].
//! - All arithmetic is exact; floating point appears only in [`eval`].

pub mod atom;
pub mod error;
pub mod eval;
pub mod expr;
pub mod matrix;
pub mod parser;
pub mod poly;
pub mod positivity;
pub mod ratfunc;
pub mod simplify;

pub use atom::{Atom, AtomRef, Function};
pub use error::{CasError, EvalError};
pub use eval::{rational_to_f64, Environment};
pub use expr::Expr;
pub use matrix::SymMatrix;
pub use poly::{Monomial, Poly};
pub use positivity::Positivity;
pub use ratfunc::RatFunc;
pub use simplify::{simplify_expr, simplify_ratfunc};
