//! # grtk-core — Wire Types for the GR Tensor Toolkit
//!
//! Every other crate in the workspace depends on `grtk-core`; it depends on
//! nothing internal. It defines the JSON-shaped values that cross the
//! capability boundary:
//!
//! - [`MetricSpec`]: coordinates, metric matrix, assumptions, signature.
//!   Shape is validated by [`MetricSpec::validate`]; symmetry is a checked
//!   property, never a construction guarantee.
//! - [`TensorArtifact`], [`ScalarArtifact`], [`InvariantsResponse`]: the
//!   serialized outputs of the tensor algebra engine.
//! - [`CheckResult`]: the pure pass/fail value produced by every check.
//! - [`Endpoint`]: the capability identifiers shared by the HTTP boundary
//!   and the in-process dispatcher.
//! - [`FixtureRecord`]: line-delimited dataset records.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `grtk-*` crates.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, `Serialize`, `Deserialize`.

pub mod artifact;
pub mod check;
pub mod dataset;
pub mod endpoint;
pub mod error;
pub mod metric;
pub mod request;

pub use artifact::{ArtifactMeta, InvariantsResponse, ScalarArtifact, TensorArtifact};
pub use check::{CheckResult, CheckResultsResponse};
pub use dataset::{ExpectedCheck, FixtureRecord};
pub use endpoint::Endpoint;
pub use error::{DatasetError, SpecError};
pub use metric::{Assumptions, MetricSpec, DEFAULT_SIGNATURE};
pub use request::{
    MetricCheckRequest, NumericSpotcheckRequest, SamplePoint, SimplifyRequest,
    SimplifyResponse, SubstituteRequest, UnitCheckRequest,
};
