//! # Application State
//!
//! Configuration plus the bookkeeping shared by all handlers. Capability
//! computations are stateless; the only shared mutable state is the
//! in-flight computation counter used for admission control and readiness.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::AppError;
use crate::middleware::metrics::ApiMetrics;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_COMPUTE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_INFLIGHT: usize = 32;

/// Server configuration.
///
/// | Variable                    | Default |
/// |-----------------------------|---------|
/// | `PORT`                      | 8000    |
/// | `GRTK_COMPUTE_TIMEOUT_SECS` | 120     |
/// | `GRTK_MAX_INFLIGHT`         | 32      |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Upper bound on one capability computation.
    pub compute_timeout: Duration,
    /// Computations allowed to run at once before requests get 503.
    pub max_inflight: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            compute_timeout: Duration::from_secs(DEFAULT_COMPUTE_TIMEOUT_SECS),
            max_inflight: DEFAULT_MAX_INFLIGHT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, String> {
            raw.trim()
                .parse()
                .map_err(|_| format!("{key} must be a positive integer, got {raw:?}"))
        }

        let mut config = Self::default();
        if let Some(raw) = lookup("PORT") {
            config.port = parse("PORT", &raw)?;
        }
        if let Some(raw) = lookup("GRTK_COMPUTE_TIMEOUT_SECS") {
            let secs: u64 = parse("GRTK_COMPUTE_TIMEOUT_SECS", &raw)?;
            if secs == 0 {
                return Err("GRTK_COMPUTE_TIMEOUT_SECS must be positive".to_string());
            }
            config.compute_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("GRTK_MAX_INFLIGHT") {
            config.max_inflight = parse("GRTK_MAX_INFLIGHT", &raw)?;
            if config.max_inflight == 0 {
                return Err("GRTK_MAX_INFLIGHT must be positive".to_string());
            }
        }
        Ok(config)
    }
}

#[derive(Debug, Default)]
struct Inflight {
    current: usize,
    peak: usize,
}

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub metrics: ApiMetrics,
    inflight: Arc<Mutex<Inflight>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, prometheus::Error> {
        Ok(Self {
            config,
            metrics: ApiMetrics::new()?,
            inflight: Arc::new(Mutex::new(Inflight::default())),
        })
    }

    /// Reserve a computation slot, released when the guard drops.
    pub fn admit(&self) -> Result<ComputeSlot, AppError> {
        let mut inflight = self.inflight.lock();
        if inflight.current >= self.config.max_inflight {
            return Err(AppError::Busy(format!(
                "{} computations already running",
                inflight.current
            )));
        }
        inflight.current += 1;
        inflight.peak = inflight.peak.max(inflight.current);
        self.metrics.compute_inflight().set(inflight.current as i64);
        Ok(ComputeSlot { state: self.clone() })
    }

    pub fn inflight(&self) -> usize {
        self.inflight.lock().current
    }

    pub fn peak_inflight(&self) -> usize {
        self.inflight.lock().peak
    }

    /// Whether a new computation would be admitted.
    pub fn has_capacity(&self) -> bool {
        self.inflight() < self.config.max_inflight
    }
}

/// A reserved computation slot.
///
/// A timed-out computation keeps running on its blocking thread; the slot
/// moves into that thread so it stays counted until the work really ends.
#[derive(Debug)]
pub struct ComputeSlot {
    state: AppState,
}

impl Drop for ComputeSlot {
    fn drop(&mut self) {
        let mut inflight = self.state.inflight.lock();
        inflight.current = inflight.current.saturating_sub(1);
        self.state.metrics.compute_inflight().set(inflight.current as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn config_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.compute_timeout, Duration::from_secs(120));
        assert_eq!(config.max_inflight, 32);
    }

    #[test]
    fn config_overrides_and_errors() {
        let config = AppConfig::from_lookup(lookup(&[("PORT", "9100"), ("GRTK_COMPUTE_TIMEOUT_SECS", "5")])).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.compute_timeout, Duration::from_secs(5));
        assert!(AppConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("GRTK_COMPUTE_TIMEOUT_SECS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("GRTK_MAX_INFLIGHT", "0")])).is_err());
    }

    #[test]
    fn slots_are_released_on_drop() {
        let state = AppState::new(AppConfig {
            max_inflight: 2,
            ..AppConfig::default()
        })
        .unwrap();
        let a = state.admit().unwrap();
        let b = state.admit().unwrap();
        assert!(!state.has_capacity());
        assert!(matches!(state.admit(), Err(AppError::Busy(_))));
        drop(a);
        assert_eq!(state.inflight(), 1);
        let _c = state.admit().unwrap();
        drop(b);
        assert_eq!(state.inflight(), 1);
        assert_eq!(state.peak_inflight(), 2);
    }
}
