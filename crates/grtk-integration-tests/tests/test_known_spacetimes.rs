//! Known spacetimes through the full stack: parse, curvature, checks and
//! the standard pipeline.

use std::sync::Arc;
use std::time::Duration;

use grtk_cas::SymMatrix;
use grtk_core::{Endpoint, MetricSpec};
use grtk_pipeline::{build_report, dispatch, LocalCapabilities, Orchestrator};
use grtk_tensor::Spacetime;
use serde_json::{json, Value};

fn minkowski() -> Value {
    json!({
        "coords": ["t", "x", "y", "z"],
        "g_dd": [[-1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]]
    })
}

fn schwarzschild() -> Value {
    json!({
        "coords": ["t", "r", "theta", "phi"],
        "g_dd": [
            ["-(1 - 2*M/r)", 0, 0, 0],
            [0, "1/(1 - 2*M/r)", 0, 0],
            [0, 0, "r**2", 0],
            [0, 0, 0, "r**2*sin(theta)**2"]
        ]
    })
}

fn frw() -> Value {
    json!({
        "coords": ["t", "x", "y", "z"],
        "g_dd": [
            [-1, 0, 0, 0],
            [0, "a(t)**2", 0, 0],
            [0, 0, "a(t)**2", 0],
            [0, 0, 0, "a(t)**2"]
        ]
    })
}

fn orchestrator() -> Orchestrator {
    Orchestrator::new(Arc::new(LocalCapabilities), Duration::from_secs(120))
}

fn passed(value: &Value) -> bool {
    value["passed"].as_bool().unwrap()
}

#[test]
fn minkowski_passes_every_structural_check() {
    assert!(passed(&dispatch(Endpoint::CheckVacuum, json!({"metric": minkowski()})).unwrap()));
    assert!(passed(&dispatch(Endpoint::CheckContractedBianchi, minkowski()).unwrap()));

    let riemann = dispatch(Endpoint::CheckRiemannSymmetries, minkowski()).unwrap();
    let checks = riemann["checks"].as_array().unwrap();
    assert_eq!(checks.len(), 3);
    assert!(checks.iter().all(passed));
}

#[tokio::test]
async fn minkowski_pipeline_report_passes() {
    let metric = minkowski();
    let dag = orchestrator().run_metric_pipeline(&metric).await.unwrap();
    let report = build_report(&metric, &dag);
    assert!(report.passed, "failed: {:?}", report.failed_checks);
    assert!(report.artifacts.contains(&"christoffel".to_string()));
    assert!(report.artifacts.contains(&"einstein".to_string()));
}

#[test]
fn schwarzschild_is_numerically_vacuum() {
    let result = dispatch(
        Endpoint::CheckVacuum,
        json!({
            "metric": schwarzschild(),
            "sample_points": [{"t": 0.0, "r": 10.0, "theta": 1.2, "phi": 0.5, "M": 1.0}],
            "epsilon": 1e-6
        }),
    )
    .unwrap();
    assert!(passed(&result), "{result}");
    assert!(result["notes"].as_str().unwrap().starts_with("mode=numeric"));
}

#[tokio::test]
async fn schwarzschild_pipeline_honours_vacuum_sample_points() {
    let mut metric = schwarzschild();
    metric["vacuum_sample_points"] = json!([{"t": 0.0, "r": 10.0, "theta": 1.2, "phi": 0.5, "M": 1.0}]);
    metric["vacuum_epsilon"] = json!(1e-6);
    let dag = orchestrator().run_metric_pipeline(&metric).await.unwrap();
    let vacuum = dag.checks.iter().find(|c| c.check_name == "vacuum").unwrap();
    assert!(vacuum.passed);
    assert!(vacuum.notes.as_deref().unwrap_or_default().starts_with("mode=numeric"));
}

#[test]
fn frw_is_not_vacuum_but_stays_symmetric() {
    assert!(!passed(&dispatch(Endpoint::CheckVacuum, json!({"metric": frw()})).unwrap()));
    assert!(passed(&dispatch(Endpoint::CheckMetricSymmetry, frw()).unwrap()));
    assert!(passed(&dispatch(Endpoint::CheckChristoffelSymmetry, frw()).unwrap()));
}

#[test]
fn metric_times_inverse_is_identity() {
    let metrics = [
        minkowski(),
        schwarzschild(),
        frw(),
        json!({"coords": ["u", "v"], "g_dd": [[0, 1], [1, "v**2"]]}),
        json!({"coords": ["theta", "phi"], "g_dd": [["R**2", 0], [0, "R**2*sin(theta)**2"]]}),
    ];
    for metric in metrics {
        let spec: MetricSpec = serde_json::from_value(metric).unwrap();
        let space = Spacetime::from_spec(&spec).unwrap();
        let product = space.metric().g_dd.mul(space.inverse().unwrap());
        assert_eq!(product, SymMatrix::identity(spec.dimension()), "{:?}", spec.coords);
    }
}

#[test]
fn singular_metric_has_no_inverse() {
    let spec = MetricSpec::new(
        vec!["x".into(), "y".into()],
        vec![vec![json!("x"), json!("x")], vec![json!("x"), json!("x")]],
    );
    let space = Spacetime::from_spec(&spec).unwrap();
    assert!(space.inverse().is_err());
}
