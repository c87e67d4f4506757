//! # Error Types
//!
//! - [`ServiceError`]: a capability rejected its input or could not compute
//!   an artifact. The API layer maps these to HTTP statuses.
//! - [`CapabilityError`]: an invocation failed, locally or over HTTP. The
//!   orchestrator records these as failed nodes.
//! - [`PipelineError`]: the pipeline input itself is unusable.

use grtk_core::{Endpoint, SpecError};
use grtk_tensor::TensorError;
use thiserror::Error;

/// Failure of a stateless capability operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The metric has an impossible shape.
    #[error("invalid metric: {0}")]
    Validation(#[from] SpecError),

    /// The request body does not match the capability's schema.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A symbolic computation failed.
    #[error("{0}")]
    Computation(TensorError),
}

impl From<TensorError> for ServiceError {
    fn from(error: TensorError) -> Self {
        match error {
            TensorError::Spec(spec) => Self::Validation(spec),
            other => Self::Computation(other),
        }
    }
}

/// Failure of a capability invocation.
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// The capability itself reported an error.
    #[error("{endpoint}: {source}")]
    Service {
        endpoint: Endpoint,
        source: ServiceError,
    },

    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: Endpoint,
        source: reqwest::Error,
    },

    /// The remote capability answered with a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: Endpoint,
        status: u16,
        body: String,
    },

    /// The response body is not JSON.
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: Endpoint,
        source: reqwest::Error,
    },

    /// The invocation did not finish within the step timeout.
    #[error("{endpoint} timed out after {secs}s")]
    Timeout { endpoint: Endpoint, secs: u64 },

    /// The blocking worker running the capability died.
    #[error("worker for {endpoint} failed: {reason}")]
    Worker { endpoint: Endpoint, reason: String },

    /// The client could not be configured.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Failure to build or run a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The metric input is not a JSON object.
    #[error("pipeline input must be a JSON object")]
    NotAnObject,

    /// A configuration value is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Dataset IO or decoding failed.
    #[error(transparent)]
    Dataset(#[from] grtk_core::DatasetError),

    /// A capability client could not be built.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}
