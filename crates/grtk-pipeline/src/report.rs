//! # Run Reports
//!
//! Summarizes a finished [`RunDag`] for humans and downstream tools: the
//! assumptions the run was made under, which artifacts were produced and
//! every check verdict.

use grtk_core::{CheckResult, DEFAULT_SIGNATURE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dag::RunDag;

/// Internal computations always use geometrized units (G = c = 1).
pub const UNITS_INTERNAL: &str = "geometrized";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportAssumptions {
    /// Coordinates as given in the input, `null` when absent.
    pub coords: Value,
    pub signature: String,
    pub units_internal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub assumptions: ReportAssumptions,
    /// Output keys of the stored artifacts, in plan order.
    pub artifacts: Vec<String>,
    pub checks: Vec<CheckResult>,
    pub failed_checks: Vec<CheckResult>,
    pub passed: bool,
}

pub fn build_report(metric: &Value, dag: &RunDag) -> RunReport {
    let failed_checks: Vec<CheckResult> = dag.failed_checks().cloned().collect();
    let signature = metric
        .get("signature")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_SIGNATURE)
        .to_string();
    RunReport {
        assumptions: ReportAssumptions {
            coords: metric.get("coords").cloned().unwrap_or(Value::Null),
            signature,
            units_internal: UNITS_INTERNAL.to_string(),
        },
        artifacts: dag.artifact_keys(),
        checks: dag.checks.clone(),
        passed: failed_checks.is_empty(),
        failed_checks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{NodeStatus, RunNode, StepKind};
    use grtk_core::Endpoint;
    use serde_json::json;

    fn dag_with(checks: Vec<CheckResult>) -> RunDag {
        let mut dag = RunDag::new();
        dag.add_node(RunNode {
            name: "ricci".into(),
            endpoint: Endpoint::Ricci,
            payload: json!({}),
            output_key: Some("ricci".into()),
            kind: StepKind::Artifact,
            status: NodeStatus::Ok,
            outputs: json!({"name": "ricci"}),
            checks: vec![],
        });
        dag.add_node(RunNode {
            name: "checks".into(),
            endpoint: Endpoint::CheckRiemannSymmetries,
            payload: json!({}),
            output_key: None,
            kind: StepKind::Checks,
            status: NodeStatus::Ok,
            outputs: json!({}),
            checks,
        });
        dag
    }

    #[test]
    fn passing_report() {
        let metric = json!({"coords": ["t", "r"], "g_dd": [[-1, 0], [0, 1]]});
        let report = build_report(&metric, &dag_with(vec![CheckResult::pass("a")]));
        assert!(report.passed);
        assert!(report.failed_checks.is_empty());
        assert_eq!(report.artifacts, ["ricci"]);
        assert_eq!(report.assumptions.coords, json!(["t", "r"]));
        assert_eq!(report.assumptions.signature, "-+++");
        assert_eq!(report.assumptions.units_internal, "geometrized");
    }

    #[test]
    fn failed_checks_are_listed() {
        let metric = json!({"coords": ["x"], "signature": "+"});
        let report = build_report(&metric, &dag_with(vec![CheckResult::pass("a"), CheckResult::fail("b")]));
        assert!(!report.passed);
        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.failed_checks, [CheckResult::fail("b")]);
        assert_eq!(report.assumptions.signature, "+");
    }

    #[test]
    fn serialized_shape() {
        let report = build_report(&json!({}), &RunDag::new());
        let value = serde_json::to_value(report).unwrap();
        assert_eq!(
            value,
            json!({
                "assumptions": {"coords": null, "signature": "-+++", "units_internal": "geometrized"},
                "artifacts": [],
                "checks": [],
                "failed_checks": [],
                "passed": true
            })
        );
    }
}
