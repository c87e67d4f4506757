//! # grtk-cli — Command-Line Tool for the GR Tensor Toolkit
//!
//! ## Subcommands
//!
//! - `grtk run`: run the standard metric pipeline and print the report.
//! - `grtk eval`: run every record of a JSONL dataset and compare the
//!   expected check verdicts.
//!
//! ```bash
//! grtk run --metric-json schwarzschild.json --local
//! grtk run --metric-json frw.json --base-url http://127.0.0.1:8000 --out report.json
//! grtk eval --dataset fixtures.jsonl --limit 10 --strict
//! ```
//!
//! Without `--local`, capabilities are called over HTTP. The base URL and
//! step timeout come from `--base-url` / `--step-timeout-secs`, falling
//! back to `GRTK_BASE_URL` / `GRTK_STEP_TIMEOUT_SECS`.

pub mod eval;
pub mod output;
pub mod run;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use grtk_pipeline::{Capability, HttpCapabilities, LocalCapabilities, Orchestrator, PipelineConfig};

/// Where capability calls go.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Compute in-process instead of calling a capability server.
    #[arg(long, conflicts_with = "base_url")]
    pub local: bool,

    /// Capability server base URL.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Per-step timeout in seconds.
    #[arg(long)]
    pub step_timeout_secs: Option<u64>,
}

impl TargetArgs {
    /// Merge flags over the environment configuration.
    pub fn config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::from_env()?;
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(secs) = self.step_timeout_secs {
            anyhow::ensure!(secs > 0, "--step-timeout-secs must be positive");
            config.step_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn orchestrator(&self) -> Result<Orchestrator> {
        let config = self.config()?;
        let capability: Arc<dyn Capability> = if self.local {
            tracing::debug!("using in-process capabilities");
            Arc::new(LocalCapabilities)
        } else {
            tracing::debug!(base_url = %config.base_url, "using HTTP capabilities");
            Arc::new(
                HttpCapabilities::new(&config.base_url, config.step_timeout)
                    .with_context(|| format!("cannot reach capabilities at {}", config.base_url))?,
            )
        };
        Ok(Orchestrator::with_config(capability, &config))
    }
}

/// Runtime for the async pipeline behind the synchronous subcommands.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
