//! # HTTP Capability Client
//!
//! [`HttpCapabilities`] POSTs each payload to `{base_url}/physics/{slug}`
//! and returns the decoded JSON body. Transport failures (connection
//! refused, reset) are retried with exponential backoff; a response with a
//! non-2xx status is returned to the caller immediately as
//! [`CapabilityError::Status`].

use std::time::Duration;

use async_trait::async_trait;
use grtk_core::Endpoint;
use serde_json::Value;
use url::Url;

use crate::capability::Capability;
use crate::error::CapabilityError;

/// Retry attempts after the first request.
const MAX_RETRIES: u32 = 2;

/// Delay before the first retry; doubles each attempt.
const BASE_DELAY_MS: u64 = 200;

/// Capability client for a remote `grtk-api` server.
#[derive(Debug, Clone)]
pub struct HttpCapabilities {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCapabilities {
    /// Build a client for `base_url` whose requests give up after `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CapabilityError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| CapabilityError::Config(format!("invalid base URL {base_url:?}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CapabilityError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, CapabilityError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{}", endpoint.path()))
            .map_err(|e| CapabilityError::Config(format!("invalid endpoint URL: {e}")))
    }

    async fn send(&self, url: &Url, payload: &Value) -> Result<reqwest::Response, reqwest::Error> {
        for attempt in 0..MAX_RETRIES {
            match self.client.post(url.clone()).json(payload).send().await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_timeout() => return Err(e),
                Err(e) => {
                    let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt));
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = MAX_RETRIES,
                        %url,
                        "capability request failed, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
        self.client.post(url.clone()).json(payload).send().await
    }
}

#[async_trait]
impl Capability for HttpCapabilities {
    async fn invoke(&self, endpoint: Endpoint, payload: &Value) -> Result<Value, CapabilityError> {
        let url = self.endpoint_url(endpoint)?;
        tracing::debug!(%url, "POST capability");

        let response = self
            .send(&url, payload)
            .await
            .map_err(|source| CapabilityError::Http { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|source| CapabilityError::Decode { endpoint, source })
    }
}
