//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded by
//! [`metrics_middleware`]. Computation metrics (in-flight count, duration
//! and timeouts per capability) are recorded by the physics handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    compute_inflight: IntGauge,
    compute_duration_seconds: HistogramVec,
    compute_timeouts_total: IntCounterVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .map(|metric| metric.get_counter().get_value() as u64)
        .sum()
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("grtk_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("grtk_http_request_duration_seconds", "HTTP request duration in seconds")
                .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["method", "path"],
        )?;
        let http_errors_total = IntCounterVec::new(
            Opts::new("grtk_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )?;
        let compute_inflight = IntGauge::new("grtk_compute_inflight", "Capability computations running")?;
        let compute_duration_seconds = HistogramVec::new(
            HistogramOpts::new("grtk_compute_duration_seconds", "Capability computation time in seconds")
                .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0]),
            &["capability"],
        )?;
        let compute_timeouts_total = IntCounterVec::new(
            Opts::new("grtk_compute_timeouts_total", "Capability computations that timed out"),
            &["capability"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;
        registry.register(Box::new(compute_inflight.clone()))?;
        registry.register(Box::new(compute_duration_seconds.clone()))?;
        registry.register(Box::new(compute_timeouts_total.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                compute_inflight,
                compute_duration_seconds,
                compute_timeouts_total,
            }),
        })
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Total 4xx/5xx count across all labels.
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    /// Total computation timeouts across all capabilities.
    pub fn timeouts(&self) -> u64 {
        sum_counter(&self.inner.compute_timeouts_total)
    }

    pub fn compute_inflight(&self) -> &IntGauge {
        &self.inner.compute_inflight
    }

    pub fn observe_compute(&self, capability: &str, duration_secs: f64) {
        self.inner
            .compute_duration_seconds
            .with_label_values(&[capability])
            .observe(duration_secs);
    }

    pub fn record_timeout(&self, capability: &str) {
        self.inner.compute_timeouts_total.with_label_values(&[capability]).inc();
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

/// Middleware that records HTTP request metrics.
///
/// Mounted as a route layer so the matched route template labels the
/// request; unknown paths never reach it.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(&method, &path, response.status().as_u16(), start.elapsed().as_secs_f64());
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let m = ApiMetrics::new().unwrap();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
        assert_eq!(m.timeouts(), 0);
    }

    #[test]
    fn errors_are_counted_separately() {
        let m = ApiMetrics::new().unwrap();
        m.record_request("POST", "/physics/ricci", 200, 0.01);
        m.record_request("POST", "/physics/ricci", 422, 0.02);
        m.record_request("POST", "/physics/riemann", 504, 120.0);
        assert_eq!(m.requests(), 3);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn encoded_output_names_the_metrics() {
        let m = ApiMetrics::new().unwrap();
        m.record_request("POST", "/physics/christoffel", 200, 0.01);
        m.observe_compute("christoffel", 0.5);
        m.record_timeout("riemann");
        m.compute_inflight().set(3);
        let text = m.gather_and_encode().unwrap();
        assert!(text.contains("grtk_http_requests_total"));
        assert!(text.contains(r#"path="/physics/christoffel""#));
        assert!(text.contains("grtk_compute_duration_seconds"));
        assert!(text.contains(r#"grtk_compute_timeouts_total{capability="riemann"} 1"#));
        assert!(text.contains("grtk_compute_inflight 3"));
        assert_eq!(m.timeouts(), 1);
    }

    #[test]
    fn clones_share_the_registry() {
        let m = ApiMetrics::new().unwrap();
        let clone = m.clone();
        clone.record_request("GET", "/health/liveness", 200, 0.001);
        assert_eq!(m.requests(), 1);
    }
}
