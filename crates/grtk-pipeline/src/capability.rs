//! # Capability Invocation
//!
//! The orchestrator talks to capabilities through the [`Capability`] trait.
//! Two implementations exist:
//!
//! - [`LocalCapabilities`] runs [`crate::service::dispatch`] in-process on
//!   the blocking thread pool.
//! - [`crate::http::HttpCapabilities`] POSTs to a running capability server.

use async_trait::async_trait;
use grtk_core::Endpoint;
use serde_json::Value;

use crate::error::CapabilityError;
use crate::service;

/// A source of capability responses.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Invoke `endpoint` with a JSON payload.
    async fn invoke(&self, endpoint: Endpoint, payload: &Value) -> Result<Value, CapabilityError>;
}

/// In-process capabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCapabilities;

#[async_trait]
impl Capability for LocalCapabilities {
    async fn invoke(&self, endpoint: Endpoint, payload: &Value) -> Result<Value, CapabilityError> {
        let payload = payload.clone();
        // Symbolic work is CPU-bound.
        let joined = tokio::task::spawn_blocking(move || service::dispatch(endpoint, payload)).await;
        match joined {
            Ok(result) => result.map_err(|source| CapabilityError::Service { endpoint, source }),
            Err(join) => Err(CapabilityError::Worker {
                endpoint,
                reason: join.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn local_invocation_returns_json() {
        let out = LocalCapabilities
            .invoke(Endpoint::MetricValidate, &json!({"coords": ["x"], "g_dd": [[1]]}))
            .await
            .unwrap();
        assert_eq!(out["checks"][0]["passed"], true);
    }

    #[tokio::test]
    async fn service_errors_carry_the_endpoint() {
        let err = LocalCapabilities
            .invoke(Endpoint::Ricci, &json!({"coords": [], "g_dd": []}))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Service { endpoint: Endpoint::Ricci, .. }));
        assert!(err.to_string().starts_with("/physics/ricci: invalid metric"));
    }
}
