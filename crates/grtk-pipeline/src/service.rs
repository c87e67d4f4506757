//! # Capability Operations
//!
//! One stateless function per capability, shared by the in-process
//! dispatcher and the HTTP boundary. Each call parses its own metric and
//! builds a fresh [`Spacetime`], so no state survives between calls.
//!
//! ## Failure policy
//!
//! | Input problem                 | Artifact capabilities     | Check capabilities       |
//! |-------------------------------|---------------------------|--------------------------|
//! | impossible metric shape       | `ServiceError::Validation`| `ServiceError::Validation` |
//! | unparsable cell, singular g   | `ServiceError::Computation` | failed `CheckResult` with notes |

use grtk_checks::{self as checks, symmetry};
use grtk_core::{
    CheckResult, CheckResultsResponse, Endpoint, InvariantsResponse, MetricCheckRequest,
    MetricSpec, NumericSpotcheckRequest, ScalarArtifact, SimplifyRequest, SimplifyResponse,
    SubstituteRequest, TensorArtifact, UnitCheckRequest,
};
use grtk_tensor::{ops, parse_metric, Spacetime, TensorError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ServiceError;

fn spacetime(spec: &MetricSpec) -> Result<Spacetime, ServiceError> {
    Ok(Spacetime::from_spec(spec)?)
}

/// Shape errors are rejected; any other parse failure becomes failed
/// results named `names`.
fn checked_spacetime(
    spec: &MetricSpec,
    names: &[&str],
) -> Result<Result<Spacetime, Vec<CheckResult>>, ServiceError> {
    match Spacetime::from_spec(spec) {
        Ok(space) => Ok(Ok(space)),
        Err(TensorError::Spec(error)) => Err(ServiceError::Validation(error)),
        Err(error) => Ok(Err(names
            .iter()
            .map(|name| CheckResult::fail(*name).with_notes(error.to_string()))
            .collect())),
    }
}

fn single(results: Vec<CheckResult>, name: &str) -> CheckResult {
    results
        .into_iter()
        .next()
        .unwrap_or_else(|| CheckResult::fail(name))
}

// ---------------------------------------------------------------------------
// Artifact capabilities
// ---------------------------------------------------------------------------

pub fn christoffel(spec: &MetricSpec) -> Result<TensorArtifact, ServiceError> {
    let space = spacetime(spec)?;
    let meta = space.metric().meta();
    Ok(space.christoffel()?.to_artifact("christoffel", "udd", meta))
}

pub fn riemann(spec: &MetricSpec) -> Result<TensorArtifact, ServiceError> {
    let space = spacetime(spec)?;
    let meta = space.metric().meta();
    Ok(space.riemann()?.to_artifact("riemann", "uddd", meta))
}

pub fn ricci(spec: &MetricSpec) -> Result<TensorArtifact, ServiceError> {
    let space = spacetime(spec)?;
    let meta = space.metric().meta();
    Ok(space.ricci()?.to_artifact("ricci", "dd", meta))
}

pub fn ricci_scalar(spec: &MetricSpec) -> Result<ScalarArtifact, ServiceError> {
    let space = spacetime(spec)?;
    Ok(ScalarArtifact {
        name: "ricci_scalar".to_string(),
        value: space.ricci_scalar()?.to_string(),
        meta: space.metric().meta(),
    })
}

pub fn einstein_tensor(spec: &MetricSpec) -> Result<TensorArtifact, ServiceError> {
    let space = spacetime(spec)?;
    let meta = space.metric().meta();
    Ok(space.einstein()?.to_artifact("einstein", "dd", meta))
}

/// Ricci scalar and Kretschmann scalar.
pub fn invariants(spec: &MetricSpec) -> Result<InvariantsResponse, ServiceError> {
    let space = spacetime(spec)?;
    let scalars = [
        ("ricci_scalar".to_string(), space.ricci_scalar()?.to_string()),
        ("kretschmann".to_string(), space.kretschmann()?.to_string()),
    ]
    .into_iter()
    .collect();
    Ok(InvariantsResponse {
        scalars,
        meta: space.metric().meta(),
    })
}

// ---------------------------------------------------------------------------
// Check capabilities
// ---------------------------------------------------------------------------

pub fn metric_validate(spec: &MetricSpec) -> Result<CheckResultsResponse, ServiceError> {
    let checks = match parse_metric(spec) {
        Ok(metric) => checks::validate_metric(&metric),
        Err(TensorError::Spec(error)) => return Err(ServiceError::Validation(error)),
        Err(error) => vec![CheckResult::fail(symmetry::METRIC_SYMMETRY).with_notes(error.to_string())],
    };
    Ok(CheckResultsResponse { checks })
}

pub fn check_metric_symmetry(spec: &MetricSpec) -> Result<CheckResult, ServiceError> {
    Ok(single(metric_validate(spec)?.checks, symmetry::METRIC_SYMMETRY))
}

pub fn check_christoffel_symmetry(spec: &MetricSpec) -> Result<CheckResult, ServiceError> {
    Ok(match checked_spacetime(spec, &[symmetry::CHRISTOFFEL_SYMMETRY])? {
        Ok(space) => checks::christoffel_symmetry(&space),
        Err(failed) => single(failed, symmetry::CHRISTOFFEL_SYMMETRY),
    })
}

pub fn check_riemann_symmetries(spec: &MetricSpec) -> Result<CheckResultsResponse, ServiceError> {
    let names = [
        symmetry::RIEMANN_ANTISYM_LAST,
        symmetry::RIEMANN_ANTISYM_FIRST,
        symmetry::RIEMANN_PAIR_EXCHANGE,
    ];
    let checks = match checked_spacetime(spec, &names)? {
        Ok(space) => checks::riemann_symmetries(&space),
        Err(failed) => failed,
    };
    Ok(CheckResultsResponse { checks })
}

pub fn check_contracted_bianchi(spec: &MetricSpec) -> Result<CheckResult, ServiceError> {
    let name = checks::bianchi::CONTRACTED_BIANCHI;
    Ok(match checked_spacetime(spec, &[name])? {
        Ok(space) => checks::contracted_bianchi(&space),
        Err(failed) => single(failed, name),
    })
}

pub fn check_vacuum(request: &MetricCheckRequest) -> Result<CheckResult, ServiceError> {
    let name = checks::vacuum::VACUUM;
    Ok(match checked_spacetime(&request.metric, &[name])? {
        Ok(space) => checks::vacuum(&space, request.sample_points.as_deref(), request.epsilon),
        Err(failed) => single(failed, name),
    })
}

// ---------------------------------------------------------------------------
// Expression capabilities
// ---------------------------------------------------------------------------

/// `expression` takes precedence over `tensor`; with neither the response
/// is empty.
pub fn simplify(request: &SimplifyRequest) -> SimplifyResponse {
    if let Some(expression) = &request.expression {
        return SimplifyResponse {
            expression: Some(ops::simplify_expression(expression, request.level)),
            tensor: None,
        };
    }
    SimplifyResponse {
        expression: None,
        tensor: request
            .tensor
            .as_ref()
            .map(|tensor| ops::simplify_tensor(tensor, request.level)),
    }
}

pub fn substitute(request: &SubstituteRequest) -> Result<SimplifyResponse, ServiceError> {
    let computation = ServiceError::Computation;
    if let Some(expression) = &request.expression {
        let substituted = ops::substitute_expression(expression, &request.substitutions).map_err(computation)?;
        return Ok(SimplifyResponse {
            expression: Some(substituted),
            tensor: None,
        });
    }
    let tensor = match &request.tensor {
        Some(tensor) => Some(ops::substitute_tensor(tensor, &request.substitutions).map_err(computation)?),
        None => None,
    };
    Ok(SimplifyResponse {
        expression: None,
        tensor,
    })
}

pub fn numeric_spotcheck(request: &NumericSpotcheckRequest) -> CheckResult {
    checks::numeric_spotcheck(
        request.expression.as_deref(),
        request.tensor.as_ref(),
        &request.sample_points,
    )
}

pub fn unit_check(request: &UnitCheckRequest) -> CheckResult {
    checks::unit_check(&request.expression, &request.symbol_units, &request.unit_system)
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, ServiceError> {
    serde_json::from_value(payload).map_err(|e| ServiceError::InvalidPayload(e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<Value, ServiceError> {
    serde_json::to_value(value).map_err(|e| ServiceError::InvalidPayload(e.to_string()))
}

/// Run `endpoint` on a JSON payload and return its JSON response.
pub fn dispatch(endpoint: Endpoint, payload: Value) -> Result<Value, ServiceError> {
    tracing::debug!(%endpoint, "dispatching capability");
    match endpoint {
        Endpoint::MetricValidate => encode(&metric_validate(&decode(payload)?)?),
        Endpoint::Christoffel => encode(&christoffel(&decode(payload)?)?),
        Endpoint::Riemann => encode(&riemann(&decode(payload)?)?),
        Endpoint::Ricci => encode(&ricci(&decode(payload)?)?),
        Endpoint::RicciScalar => encode(&ricci_scalar(&decode(payload)?)?),
        Endpoint::EinsteinTensor => encode(&einstein_tensor(&decode(payload)?)?),
        Endpoint::Invariants => encode(&invariants(&decode(payload)?)?),
        Endpoint::CheckMetricSymmetry => encode(&check_metric_symmetry(&decode(payload)?)?),
        Endpoint::CheckChristoffelSymmetry => encode(&check_christoffel_symmetry(&decode(payload)?)?),
        Endpoint::CheckRiemannSymmetries => encode(&check_riemann_symmetries(&decode(payload)?)?),
        Endpoint::CheckContractedBianchi => encode(&check_contracted_bianchi(&decode(payload)?)?),
        Endpoint::CheckVacuum => encode(&check_vacuum(&decode(payload)?)?),
        Endpoint::Simplify => encode(&simplify(&decode(payload)?)),
        Endpoint::Substitute => encode(&substitute(&decode(payload)?)?),
        Endpoint::NumericSpotcheck => encode(&numeric_spotcheck(&decode(payload)?)),
        Endpoint::UnitCheck => encode(&unit_check(&decode(payload)?)),
    }
}
