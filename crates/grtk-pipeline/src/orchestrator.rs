//! # Pipeline Orchestrator
//!
//! Executes a plan of capability invocations strictly in order against any
//! [`Capability`] and records every step in a [`RunDag`]. A failing step is
//! recorded and execution continues, so one broken quantity never hides the
//! checks that follow it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use grtk_core::{CheckResult, Endpoint};
use serde_json::{json, Map, Value};

use crate::capability::Capability;
use crate::config::PipelineConfig;
use crate::dag::{NodeStatus, PlanStep, RunDag, RunNode, StepKind};
use crate::error::{CapabilityError, PipelineError};

/// Keys of the pipeline input routed to the vacuum step only.
pub const VACUUM_SAMPLE_POINTS_KEY: &str = "vacuum_sample_points";
pub const VACUUM_EPSILON_KEY: &str = "vacuum_epsilon";

#[derive(Clone)]
pub struct Orchestrator {
    capability: Arc<dyn Capability>,
    step_timeout: Duration,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("step_timeout", &self.step_timeout)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(capability: Arc<dyn Capability>, step_timeout: Duration) -> Self {
        Self {
            capability,
            step_timeout,
        }
    }

    pub fn with_config(capability: Arc<dyn Capability>, config: &PipelineConfig) -> Self {
        Self::new(capability, config.step_timeout)
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    /// Execute `steps` on a fresh graph.
    pub async fn run_plan(&self, steps: &[PlanStep]) -> RunDag {
        let mut dag = RunDag::new();
        self.execute(&mut dag, steps, 0).await;
        dag
    }

    /// Re-execute `steps` from position `index`.
    ///
    /// When `index` falls inside the recorded nodes, the graph is truncated
    /// to `[0, index)` and its artifacts and checks are cleared. Otherwise
    /// the graph is left as is and any steps from `index` are appended.
    pub async fn rerun_from(&self, dag: &mut RunDag, steps: &[PlanStep], index: usize) {
        let truncated = dag.truncate(index);
        tracing::info!(run_id = %dag.run_id, index, truncated, "rerunning pipeline");
        self.execute(dag, steps, index).await;
    }

    /// Run the standard metric pipeline on `metric`.
    pub async fn run_metric_pipeline(&self, metric: &Value) -> Result<RunDag, PipelineError> {
        let steps = metric_pipeline_plan(metric)?;
        Ok(self.run_plan(&steps).await)
    }

    async fn execute(&self, dag: &mut RunDag, steps: &[PlanStep], start: usize) {
        for (index, step) in steps.iter().enumerate().skip(start) {
            dag.running = Some(dag.nodes.len());
            let started = Instant::now();
            let node = self.run_step(step).await;
            tracing::info!(
                run_id = %dag.run_id,
                index,
                step = %step.name,
                status = ?node.status,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "pipeline step finished"
            );
            dag.add_node(node);
        }
        dag.running = None;
    }

    async fn invoke(&self, step: &PlanStep) -> Result<Value, CapabilityError> {
        let call = self.capability.invoke(step.endpoint, &step.payload);
        match tokio::time::timeout(self.step_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CapabilityError::Timeout {
                endpoint: step.endpoint,
                secs: self.step_timeout.as_secs(),
            }),
        }
    }

    async fn run_step(&self, step: &PlanStep) -> RunNode {
        let classified = self.invoke(step).await.map_err(|e| e.to_string()).and_then(|response| {
            let checks = match step.kind {
                StepKind::Checks => normalize_checks(&response)?,
                _ => Vec::new(),
            };
            Ok((response, checks))
        });

        let (status, outputs, checks) = match classified {
            Ok((response, checks)) => (NodeStatus::Ok, response, checks),
            Err(message) => {
                tracing::warn!(step = %step.name, endpoint = %step.endpoint, "step failed: {message}");
                let checks = match step.kind {
                    StepKind::Checks => vec![CheckResult::fail(step.name.as_str()).with_notes(message.clone())],
                    _ => Vec::new(),
                };
                (NodeStatus::Fail, json!({ "error": message }), checks)
            }
        };

        RunNode {
            name: step.name.clone(),
            endpoint: step.endpoint,
            payload: step.payload.clone(),
            output_key: step.output_key.clone(),
            kind: step.kind,
            status,
            outputs,
            checks,
        }
    }
}

/// A `{checks: [...]}` response yields its list; anything else is a single
/// result.
fn normalize_checks(response: &Value) -> Result<Vec<CheckResult>, String> {
    let decoded = match response.get("checks") {
        Some(list) => serde_json::from_value(list.clone()),
        None => serde_json::from_value(response.clone()).map(|single| vec![single]),
    };
    decoded.map_err(|e| format!("malformed check response: {e}"))
}

/// The standard twelve-step plan for a metric.
///
/// `vacuum_sample_points` and `vacuum_epsilon` are removed from the metric
/// payload and passed to the vacuum step only.
pub fn metric_pipeline_plan(input: &Value) -> Result<Vec<PlanStep>, PipelineError> {
    let mut metric: Map<String, Value> = input.as_object().cloned().ok_or(PipelineError::NotAnObject)?;
    let sample_points = metric.remove(VACUUM_SAMPLE_POINTS_KEY);
    let epsilon = metric.remove(VACUUM_EPSILON_KEY);
    let metric = Value::Object(metric);

    let mut vacuum = Map::new();
    vacuum.insert("metric".to_string(), metric.clone());
    if let Some(points) = sample_points.filter(|v| !v.is_null()) {
        vacuum.insert("sample_points".to_string(), points);
    }
    if let Some(epsilon) = epsilon.filter(|v| !v.is_null()) {
        vacuum.insert("epsilon".to_string(), epsilon);
    }

    let step = |name: &str, endpoint: Endpoint, kind: StepKind| PlanStep::new(name, endpoint, metric.clone(), kind);

    Ok(vec![
        step("metric_validate", Endpoint::MetricValidate, StepKind::Checks),
        step("christoffel", Endpoint::Christoffel, StepKind::Artifact).with_output_key("christoffel"),
        step("riemann", Endpoint::Riemann, StepKind::Artifact).with_output_key("riemann"),
        step("ricci", Endpoint::Ricci, StepKind::Artifact).with_output_key("ricci"),
        step("ricci_scalar", Endpoint::RicciScalar, StepKind::Scalar).with_output_key("ricci_scalar"),
        step("einstein", Endpoint::EinsteinTensor, StepKind::Artifact).with_output_key("einstein"),
        step("invariants", Endpoint::Invariants, StepKind::Invariants).with_output_key("invariants"),
        step("check_metric_symmetry", Endpoint::CheckMetricSymmetry, StepKind::Checks),
        step("check_christoffel_symmetry", Endpoint::CheckChristoffelSymmetry, StepKind::Checks),
        step("check_riemann_symmetries", Endpoint::CheckRiemannSymmetries, StepKind::Checks),
        step("check_contracted_bianchi", Endpoint::CheckContractedBianchi, StepKind::Checks),
        PlanStep::new("check_vacuum", Endpoint::CheckVacuum, Value::Object(vacuum), StepKind::Checks),
    ])
}
