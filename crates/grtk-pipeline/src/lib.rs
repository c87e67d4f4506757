//! # grtk-pipeline — Capability Dispatch and Pipeline Orchestration
//!
//! - [`service`]: the sixteen stateless capability operations and the JSON
//!   dispatcher the HTTP boundary and in-process clients share.
//! - [`capability`], [`http`]: the [`Capability`] trait with an in-process
//!   and a reqwest-backed implementation.
//! - [`dag`], [`orchestrator`]: plan execution into a replayable
//!   [`RunDag`], with per-step timeouts and rerun-from-step.
//! - [`report`], [`evaluate`]: run reports and dataset evaluation.
//!
//! ## Example
//!
//! ```no_run
//! # async fn demo() -> Result<(), grtk_pipeline::PipelineError> {
//! use std::sync::Arc;
//! use std::time::Duration;
//! use grtk_pipeline::{build_report, LocalCapabilities, Orchestrator};
//!
//! let metric = serde_json::json!({"coords": ["t", "x"], "g_dd": [[-1, 0], [0, 1]]});
//! let orchestrator = Orchestrator::new(Arc::new(LocalCapabilities), Duration::from_secs(60));
//! let dag = orchestrator.run_metric_pipeline(&metric).await?;
//! assert!(build_report(&metric, &dag).passed);
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod config;
pub mod dag;
pub mod error;
pub mod evaluate;
pub mod http;
pub mod orchestrator;
pub mod report;
pub mod service;

pub use capability::{Capability, LocalCapabilities};
pub use config::PipelineConfig;
pub use dag::{NodeStatus, PlanStep, RunDag, RunNode, StepKind};
pub use error::{CapabilityError, PipelineError, ServiceError};
pub use evaluate::{evaluate_dataset, CheckFailure, EntryResult, Evaluation, EvaluationSummary, FailureReason};
pub use http::HttpCapabilities;
pub use orchestrator::{metric_pipeline_plan, Orchestrator};
pub use report::{build_report, RunReport};
pub use service::dispatch;
