//! # Pipeline Configuration
//!
//! Read from the environment, with CLI flags taking precedence where the
//! binary exposes one.
//!
//! | Variable                  | Default                  |
//! |---------------------------|--------------------------|
//! | `GRTK_BASE_URL`           | `http://127.0.0.1:8000`  |
//! | `GRTK_STEP_TIMEOUT_SECS`  | `60`                     |

use std::time::Duration;

use crate::error::PipelineError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Root URL of the capability server.
    pub base_url: String,
    /// Upper bound on a single pipeline step.
    pub step_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PipelineError> {
        let mut config = Self::default();
        if let Some(base_url) = lookup("GRTK_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url;
        }
        if let Some(raw) = lookup("GRTK_STEP_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                PipelineError::Config(format!("GRTK_STEP_TIMEOUT_SECS is not a number: {raw:?}"))
            })?;
            if secs == 0 {
                return Err(PipelineError::Config("GRTK_STEP_TIMEOUT_SECS must be positive".into()));
            }
            config.step_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}
