//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented capability routes into one OpenAPI
//! document served at `/openapi.json`. Tool-calling clients read request
//! schemas from here.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GRTK Capability API",
        version = "0.1.0",
        description = "Stateless symbolic general-relativity capabilities: curvature tensors, invariants, consistency checks and expression tools."
    ),
    paths(
        crate::routes::physics::metric_validate,
        crate::routes::physics::christoffel,
        crate::routes::physics::riemann,
        crate::routes::physics::ricci,
        crate::routes::physics::ricci_scalar,
        crate::routes::physics::einstein_tensor,
        crate::routes::physics::invariants,
        crate::routes::physics::check_metric_symmetry,
        crate::routes::physics::check_christoffel_symmetry,
        crate::routes::physics::check_riemann_symmetries,
        crate::routes::physics::check_contracted_bianchi,
        crate::routes::physics::check_vacuum,
        crate::routes::physics::simplify,
        crate::routes::physics::substitute,
        crate::routes::physics::numeric_spotcheck,
        crate::routes::physics::unit_check,
    ),
    components(schemas(
        grtk_core::MetricSpec,
        grtk_core::ArtifactMeta,
        grtk_core::TensorArtifact,
        grtk_core::ScalarArtifact,
        grtk_core::InvariantsResponse,
        grtk_core::CheckResult,
        grtk_core::CheckResultsResponse,
        grtk_core::MetricCheckRequest,
        grtk_core::SimplifyRequest,
        grtk_core::SimplifyResponse,
        grtk_core::SubstituteRequest,
        grtk_core::NumericSpotcheckRequest,
        grtk_core::UnitCheckRequest,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "physics", description = "Curvature artifacts and invariants"),
        (name = "checks", description = "Pass/fail consistency checks"),
        (name = "expressions", description = "Expression simplification, substitution and analysis"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grtk_core::Endpoint;

    #[test]
    fn every_capability_is_documented() {
        let spec = ApiDoc::openapi();
        for endpoint in Endpoint::all() {
            assert!(
                spec.paths.paths.contains_key(&endpoint.path()),
                "missing {}",
                endpoint.path()
            );
        }
        assert_eq!(spec.paths.paths.len(), Endpoint::all().len());
    }

    #[test]
    fn request_schemas_are_registered() {
        let spec = ApiDoc::openapi();
        let schemas = &spec.components.as_ref().unwrap().schemas;
        for name in ["MetricSpec", "MetricCheckRequest", "SubstituteRequest", "ErrorBody"] {
            assert!(schemas.contains_key(name), "missing schema {name}");
        }
    }
}
