//! # grtk-api — Capability Server
//!
//! Serves every symbolic capability as a stateless JSON POST route. The
//! same computations are reachable in-process through
//! [`grtk_pipeline::service::dispatch`]; this crate adds the HTTP boundary:
//!
//! | Path                  | Purpose                                   |
//! |-----------------------|-------------------------------------------|
//! | `POST /physics/*`     | One route per [`grtk_core::Endpoint`]     |
//! | `GET /openapi.json`   | Generated OpenAPI document                |
//! | `GET /health/liveness`| Always `ok` while the process runs        |
//! | `GET /health/readiness`| `ready`, or 503 when computations are saturated |
//! | `GET /metrics`        | Prometheus text exposition                |
//!
//! Computations run on the blocking pool under a per-request timeout and
//! an in-flight limit; see [`state::AppConfig`].

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::physics::router())
        .merge(openapi::router())
        .route_layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(state.metrics.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state);

    Router::new().merge(probes).merge(api)
}

/// GET /metrics
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 503 while every computation slot is taken.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.has_capacity() {
        (StatusCode::OK, "ready").into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("saturated: {} computations running", state.inflight()),
        )
            .into_response()
    }
}
