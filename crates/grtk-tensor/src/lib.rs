//! # grtk-tensor — Metric Parser and Tensor Algebra Engine
//!
//! Turns a [`grtk_core::MetricSpec`] into curvature:
//!
//! - [`metric`]: shape validation, coordinate symbols with assumptions, and
//!   the symbolic metric matrix.
//! - [`curvature`]: [`Spacetime`], which derives and caches the inverse
//!   metric, Christoffel symbols, Riemann, Ricci, Einstein and the
//!   curvature invariants.
//! - [`tensor`]: flat storage and conversion to and from
//!   [`grtk_core::TensorArtifact`].
//! - [`ops`]: component-wise simplify and substitute.
//! - [`sample`]: numeric evaluation at sample points.
//!
//! Component loops run in parallel on the rayon pool. Every intermediate
//! quantity is computed once per [`Spacetime`].

pub mod curvature;
pub mod error;
pub mod metric;
pub mod ops;
pub mod sample;
pub mod tensor;

pub use curvature::Spacetime;
pub use error::TensorError;
pub use metric::{parse_metric, AssumptionBuilder, CoordinateSymbol, ParsedMetric};
pub use ops::{simplify_expression, simplify_tensor, substitute_expression, substitute_tensor};
pub use sample::{max_abs_at, sweep, SampleSweep};
pub use tensor::Tensor;
