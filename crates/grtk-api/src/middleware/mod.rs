//! # Middleware Stack
//!
//! - [`metrics`]: Prometheus request and computation metrics.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly.

pub mod metrics;
