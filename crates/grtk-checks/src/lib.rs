//! # grtk-checks — Check Engine
//!
//! Structural and numeric consistency checks over a [`Spacetime`]. Every
//! check is a pure function returning a [`grtk_core::CheckResult`]; a
//! computation that fails underneath a check (singular metric, unsupported
//! construct) produces a failed result whose notes carry the error instead
//! of an `Err`.
//!
//! | Check                    | Module        |
//! |--------------------------|---------------|
//! | `metric_symmetry`        | [`symmetry`]  |
//! | `christoffel_symmetry`   | [`symmetry`]  |
//! | `riemann_antisym_last`, `riemann_antisym_first`, `riemann_pair_exchange` | [`symmetry`] |
//! | `contracted_bianchi`     | [`bianchi`]   |
//! | `vacuum`                 | [`vacuum`]    |
//! | `numeric_spotcheck`      | [`spotcheck`] |
//! | `unit_check`             | [`units`]     |
//!
//! [`Spacetime`]: grtk_tensor::Spacetime

pub mod bianchi;
pub mod error;
pub mod spotcheck;
pub mod symmetry;
pub mod units;
pub mod vacuum;

pub use bianchi::{contracted_bianchi, einstein_divergence};
pub use error::UnitError;
pub use spotcheck::numeric_spotcheck;
pub use symmetry::{christoffel_symmetry, metric_symmetry, riemann_symmetries, validate_metric};
pub use units::{parse_unit, unit_check, Dimension};
pub use vacuum::{vacuum, DEFAULT_EPSILON};
