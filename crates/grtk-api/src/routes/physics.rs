//! # Physics Capability Routes
//!
//! One stateless POST route per capability. Handlers only decode, admit
//! and time the request; the computation itself is a
//! [`grtk_pipeline::service`] call run on the blocking pool under the
//! configured timeout.
//!
//! A computation that times out is abandoned, not cancelled: its blocking
//! thread finishes in the background and keeps its in-flight slot until
//! then.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use grtk_core::{
    CheckResult, CheckResultsResponse, Endpoint, InvariantsResponse, MetricCheckRequest, MetricSpec,
    NumericSpotcheckRequest, ScalarArtifact, SimplifyRequest, SimplifyResponse, SubstituteRequest,
    TensorArtifact, UnitCheckRequest,
};
use grtk_pipeline::{service, ServiceError};

use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_json, extract_validated_json};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/physics/metric-validate", post(metric_validate))
        .route("/physics/christoffel", post(christoffel))
        .route("/physics/riemann", post(riemann))
        .route("/physics/ricci", post(ricci))
        .route("/physics/ricci-scalar", post(ricci_scalar))
        .route("/physics/einstein-tensor", post(einstein_tensor))
        .route("/physics/invariants", post(invariants))
        .route("/physics/check-metric-symmetry", post(check_metric_symmetry))
        .route("/physics/check-christoffel-symmetry", post(check_christoffel_symmetry))
        .route("/physics/check-riemann-symmetries", post(check_riemann_symmetries))
        .route("/physics/check-contracted-bianchi", post(check_contracted_bianchi))
        .route("/physics/check-vacuum", post(check_vacuum))
        .route("/physics/simplify", post(simplify))
        .route("/physics/substitute", post(substitute))
        .route("/physics/numeric-spotcheck", post(numeric_spotcheck))
        .route("/physics/unit-check", post(unit_check))
}

/// Run `job` on the blocking pool, bounded by the compute timeout.
async fn compute<T, F>(state: &AppState, endpoint: Endpoint, job: F) -> Result<Json<T>, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
{
    let slot = state.admit()?;
    let capability = endpoint.slug();
    let limit = state.config.compute_timeout;
    let started = Instant::now();

    let worker = tokio::task::spawn_blocking(move || {
        let _slot = slot;
        job()
    });

    match tokio::time::timeout(limit, worker).await {
        Ok(Ok(result)) => {
            let elapsed = started.elapsed();
            state.metrics.observe_compute(capability, elapsed.as_secs_f64());
            tracing::debug!(capability, elapsed_ms = elapsed.as_millis() as u64, ok = result.is_ok(), "computed");
            Ok(Json(result?))
        }
        Ok(Err(join)) => Err(AppError::Internal(format!("{capability} worker failed: {join}"))),
        Err(_) => {
            state.metrics.record_timeout(capability);
            tracing::warn!(capability, limit_secs = limit.as_secs(), "computation timed out");
            Err(AppError::Timeout { secs: limit.as_secs() })
        }
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// Christoffel symbols of the second kind, `Γ^a_{bc}`.
#[utoipa::path(
    post,
    path = "/physics/christoffel",
    request_body = MetricSpec,
    responses(
        (status = 200, description = "Christoffel symbols", body = TensorArtifact),
        (status = 422, description = "Invalid metric or failed computation", body = ErrorBody),
    ),
    tag = "physics"
)]
async fn christoffel(
    State(state): State<AppState>,
    body: Result<Json<MetricSpec>, JsonRejection>,
) -> Result<Json<TensorArtifact>, AppError> {
    let spec = extract_validated_json(body)?;
    compute(&state, Endpoint::Christoffel, move || service::christoffel(&spec)).await
}

/// Riemann tensor `R^a_{bcd}`.
#[utoipa::path(
    post,
    path = "/physics/riemann",
    request_body = MetricSpec,
    responses(
        (status = 200, description = "Riemann tensor", body = TensorArtifact),
        (status = 422, description = "Invalid metric or failed computation", body = ErrorBody),
    ),
    tag = "physics"
)]
async fn riemann(
    State(state): State<AppState>,
    body: Result<Json<MetricSpec>, JsonRejection>,
) -> Result<Json<TensorArtifact>, AppError> {
    let spec = extract_validated_json(body)?;
    compute(&state, Endpoint::Riemann, move || service::riemann(&spec)).await
}

/// Ricci tensor `R_{ab}`.
#[utoipa::path(
    post,
    path = "/physics/ricci",
    request_body = MetricSpec,
    responses(
        (status = 200, description = "Ricci tensor", body = TensorArtifact),
        (status = 422, description = "Invalid metric or failed computation", body = ErrorBody),
    ),
    tag = "physics"
)]
async fn ricci(
    State(state): State<AppState>,
    body: Result<Json<MetricSpec>, JsonRejection>,
) -> Result<Json<TensorArtifact>, AppError> {
    let spec = extract_validated_json(body)?;
    compute(&state, Endpoint::Ricci, move || service::ricci(&spec)).await
}

#[utoipa::path(
    post,
    path = "/physics/ricci-scalar",
    request_body = MetricSpec,
    responses(
        (status = 200, description = "Ricci scalar", body = ScalarArtifact),
        (status = 422, description = "Invalid metric or failed computation", body = ErrorBody),
    ),
    tag = "physics"
)]
async fn ricci_scalar(
    State(state): State<AppState>,
    body: Result<Json<MetricSpec>, JsonRejection>,
) -> Result<Json<ScalarArtifact>, AppError> {
    let spec = extract_validated_json(body)?;
    compute(&state, Endpoint::RicciScalar, move || service::ricci_scalar(&spec)).await
}

/// Einstein tensor `G_{ab}`.
#[utoipa::path(
    post,
    path = "/physics/einstein-tensor",
    request_body = MetricSpec,
    responses(
        (status = 200, description = "Einstein tensor", body = TensorArtifact),
        (status = 422, description = "Invalid metric or failed computation", body = ErrorBody),
    ),
    tag = "physics"
)]
async fn einstein_tensor(
    State(state): State<AppState>,
    body: Result<Json<MetricSpec>, JsonRejection>,
) -> Result<Json<TensorArtifact>, AppError> {
    let spec = extract_validated_json(body)?;
    compute(&state, Endpoint::EinsteinTensor, move || service::einstein_tensor(&spec)).await
}

/// Ricci and Kretschmann scalars.
#[utoipa::path(
    post,
    path = "/physics/invariants",
    request_body = MetricSpec,
    responses(
        (status = 200, description = "Curvature invariants", body = InvariantsResponse),
        (status = 422, description = "Invalid metric or failed computation", body = ErrorBody),
    ),
    tag = "physics"
)]
async fn invariants(
    State(state): State<AppState>,
    body: Result<Json<MetricSpec>, JsonRejection>,
) -> Result<Json<InvariantsResponse>, AppError> {
    let spec = extract_validated_json(body)?;
    compute(&state, Endpoint::Invariants, move || service::invariants(&spec)).await
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/physics/metric-validate",
    request_body = MetricSpec,
    responses(
        (status = 200, description = "Metric validation checks", body = CheckResultsResponse),
        (status = 422, description = "Invalid metric shape", body = ErrorBody),
    ),
    tag = "checks"
)]
async fn metric_validate(
    State(state): State<AppState>,
    body: Result<Json<MetricSpec>, JsonRejection>,
) -> Result<Json<CheckResultsResponse>, AppError> {
    let spec = extract_validated_json(body)?;
    compute(&state, Endpoint::MetricValidate, move || service::metric_validate(&spec)).await
}

#[utoipa::path(
    post,
    path = "/physics/check-metric-symmetry",
    request_body = MetricSpec,
    responses(
        (status = 200, description = "Metric symmetry verdict", body = CheckResult),
        (status = 422, description = "Invalid metric shape", body = ErrorBody),
    ),
    tag = "checks"
)]
async fn check_metric_symmetry(
    State(state): State<AppState>,
    body: Result<Json<MetricSpec>, JsonRejection>,
) -> Result<Json<CheckResult>, AppError> {
    let spec = extract_validated_json(body)?;
    compute(&state, Endpoint::CheckMetricSymmetry, move || service::check_metric_symmetry(&spec)).await
}

#[utoipa::path(
    post,
    path = "/physics/check-christoffel-symmetry",
    request_body = MetricSpec,
    responses(
        (status = 200, description = "Christoffel lower-index symmetry verdict", body = CheckResult),
        (status = 422, description = "Invalid metric shape", body = ErrorBody),
    ),
    tag = "checks"
)]
async fn check_christoffel_symmetry(
    State(state): State<AppState>,
    body: Result<Json<MetricSpec>, JsonRejection>,
) -> Result<Json<CheckResult>, AppError> {
    let spec = extract_validated_json(body)?;
    compute(&state, Endpoint::CheckChristoffelSymmetry, move || {
        service::check_christoffel_symmetry(&spec)
    })
    .await
}

#[utoipa::path(
    post,
    path = "/physics/check-riemann-symmetries",
    request_body = MetricSpec,
    responses(
        (status = 200, description = "Riemann symmetry verdicts", body = CheckResultsResponse),
        (status = 422, description = "Invalid metric shape", body = ErrorBody),
    ),
    tag = "checks"
)]
async fn check_riemann_symmetries(
    State(state): State<AppState>,
    body: Result<Json<MetricSpec>, JsonRejection>,
) -> Result<Json<CheckResultsResponse>, AppError> {
    let spec = extract_validated_json(body)?;
    compute(&state, Endpoint::CheckRiemannSymmetries, move || {
        service::check_riemann_symmetries(&spec)
    })
    .await
}

#[utoipa::path(
    post,
    path = "/physics/check-contracted-bianchi",
    request_body = MetricSpec,
    responses(
        (status = 200, description = "Contracted Bianchi identity verdict", body = CheckResult),
        (status = 422, description = "Invalid metric shape", body = ErrorBody),
    ),
    tag = "checks"
)]
async fn check_contracted_bianchi(
    State(state): State<AppState>,
    body: Result<Json<MetricSpec>, JsonRejection>,
) -> Result<Json<CheckResult>, AppError> {
    let spec = extract_validated_json(body)?;
    compute(&state, Endpoint::CheckContractedBianchi, move || {
        service::check_contracted_bianchi(&spec)
    })
    .await
}

/// Symbolic vacuum check, or numeric when `sample_points` are given.
#[utoipa::path(
    post,
    path = "/physics/check-vacuum",
    request_body = MetricCheckRequest,
    responses(
        (status = 200, description = "Vacuum verdict", body = CheckResult),
        (status = 422, description = "Invalid metric shape or epsilon", body = ErrorBody),
    ),
    tag = "checks"
)]
async fn check_vacuum(
    State(state): State<AppState>,
    body: Result<Json<MetricCheckRequest>, JsonRejection>,
) -> Result<Json<CheckResult>, AppError> {
    let request = extract_validated_json(body)?;
    compute(&state, Endpoint::CheckVacuum, move || service::check_vacuum(&request)).await
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/physics/simplify",
    request_body = SimplifyRequest,
    responses(
        (status = 200, description = "Simplified expression or tensor", body = SimplifyResponse),
    ),
    tag = "expressions"
)]
async fn simplify(
    State(state): State<AppState>,
    body: Result<Json<SimplifyRequest>, JsonRejection>,
) -> Result<Json<SimplifyResponse>, AppError> {
    let request = extract_json(body)?;
    compute(&state, Endpoint::Simplify, move || Ok(service::simplify(&request))).await
}

#[utoipa::path(
    post,
    path = "/physics/substitute",
    request_body = SubstituteRequest,
    responses(
        (status = 200, description = "Substituted expression or tensor", body = SimplifyResponse),
        (status = 422, description = "Unparsable input or division by zero", body = ErrorBody),
    ),
    tag = "expressions"
)]
async fn substitute(
    State(state): State<AppState>,
    body: Result<Json<SubstituteRequest>, JsonRejection>,
) -> Result<Json<SimplifyResponse>, AppError> {
    let request = extract_json(body)?;
    compute(&state, Endpoint::Substitute, move || service::substitute(&request)).await
}

#[utoipa::path(
    post,
    path = "/physics/numeric-spotcheck",
    request_body = NumericSpotcheckRequest,
    responses(
        (status = 200, description = "Spot-check verdict", body = CheckResult),
    ),
    tag = "expressions"
)]
async fn numeric_spotcheck(
    State(state): State<AppState>,
    body: Result<Json<NumericSpotcheckRequest>, JsonRejection>,
) -> Result<Json<CheckResult>, AppError> {
    let request = extract_json(body)?;
    compute(&state, Endpoint::NumericSpotcheck, move || Ok(service::numeric_spotcheck(&request))).await
}

#[utoipa::path(
    post,
    path = "/physics/unit-check",
    request_body = UnitCheckRequest,
    responses(
        (status = 200, description = "Dimensional analysis verdict", body = CheckResult),
    ),
    tag = "expressions"
)]
async fn unit_check(
    State(state): State<AppState>,
    body: Result<Json<UnitCheckRequest>, JsonRejection>,
) -> Result<Json<CheckResult>, AppError> {
    let request = extract_json(body)?;
    compute(&state, Endpoint::UnitCheck, move || Ok(service::unit_check(&request))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use std::time::Duration;

    fn state(config: AppConfig) -> AppState {
        AppState::new(config).unwrap()
    }

    #[tokio::test]
    async fn compute_returns_the_job_result() {
        let state = state(AppConfig::default());
        let Json(value) = compute(&state, Endpoint::Simplify, || Ok(41 + 1)).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(state.inflight(), 0);
    }

    #[tokio::test]
    async fn compute_maps_service_errors() {
        let state = state(AppConfig::default());
        let err = compute::<(), _>(&state, Endpoint::Ricci, || {
            Err(ServiceError::Validation(grtk_core::SpecError::EmptyCoordinates))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn compute_times_out() {
        let state = state(AppConfig {
            compute_timeout: Duration::from_millis(50),
            ..AppConfig::default()
        });
        let err = compute(&state, Endpoint::Riemann, || {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Timeout { .. }));
        assert_eq!(state.metrics.timeouts(), 1);
        // The abandoned worker still holds its slot.
        assert_eq!(state.inflight(), 1);
    }

    #[tokio::test]
    async fn compute_rejects_when_saturated() {
        let state = state(AppConfig {
            max_inflight: 1,
            ..AppConfig::default()
        });
        let _held = state.admit().unwrap();
        let err = compute(&state, Endpoint::Ricci, || Ok(())).await.unwrap_err();
        assert!(matches!(err, AppError::Busy(_)));
    }
}
