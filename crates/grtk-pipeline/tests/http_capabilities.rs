//! # HTTP Capability Client Tests
//!
//! Runs [`HttpCapabilities`] and the orchestrator against wiremock servers
//! to verify request routing, status handling and response decoding without
//! a live capability server.

use std::sync::Arc;
use std::time::Duration;

use grtk_core::{Endpoint, FixtureRecord};
use grtk_pipeline::{
    build_report, evaluate_dataset, Capability, CapabilityError, HttpCapabilities, NodeStatus, Orchestrator,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpCapabilities {
    HttpCapabilities::new(&server.uri(), Duration::from_secs(5)).expect("client build")
}

fn metric() -> serde_json::Value {
    json!({"coords": ["t", "x"], "g_dd": [[-1, 0], [0, 1]]})
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn posts_payload_to_endpoint_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/physics/ricci-scalar"))
        .and(body_json(metric()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "ricci_scalar",
            "value": "0",
            "meta": {"coords": ["t", "x"], "signature": "-+++"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = client(&server)
        .invoke(Endpoint::RicciScalar, &metric())
        .await
        .expect("invoke");
    assert_eq!(out["name"], "ricci_scalar");
    assert_eq!(out["value"], "0");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_success_status_is_reported_with_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/physics/christoffel"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid metric"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .invoke(Endpoint::Christoffel, &metric())
        .await
        .expect_err("422 must fail");
    match err {
        CapabilityError::Status { endpoint, status, body } => {
            assert_eq!(endpoint, Endpoint::Christoffel);
            assert_eq!(status, 422);
            assert_eq!(body, "invalid metric");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_json_body_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/physics/riemann"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server).invoke(Endpoint::Riemann, &metric()).await.expect_err("decode");
    assert!(matches!(err, CapabilityError::Decode { endpoint: Endpoint::Riemann, .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn orchestrator_records_remote_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/physics/check-vacuum"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "check_name": "vacuum", "passed": false, "residual": "G_ab != 0"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/physics/check-riemann-symmetries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"checks": [
            {"check_name": "riemann_antisym_last", "passed": true},
            {"check_name": "riemann_antisym_first", "passed": true},
            {"check_name": "riemann_pair_exchange", "passed": true}
        ]})))
        .mount(&server)
        .await;
    // Everything else is unavailable.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(Arc::new(client(&server)), Duration::from_secs(5));
    let dag = orchestrator.run_metric_pipeline(&metric()).await.expect("plan");

    assert_eq!(dag.nodes.len(), 12);
    assert_eq!(dag.status(9), NodeStatus::Ok);
    assert_eq!(dag.status(11), NodeStatus::Ok);
    assert_eq!(dag.status(1), NodeStatus::Fail);
    assert!(dag.artifacts.is_empty());

    let report = build_report(&metric(), &dag);
    assert!(!report.passed);
    let names: Vec<_> = report.checks.iter().map(|c| c.check_name.as_str()).collect();
    assert_eq!(
        names,
        [
            "metric_validate",
            "check_metric_symmetry",
            "check_christoffel_symmetry",
            "riemann_antisym_last",
            "riemann_antisym_first",
            "riemann_pair_exchange",
            "check_contracted_bianchi",
            "vacuum",
        ]
    );
    assert_eq!(report.failed_checks.len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dataset_from_file_is_evaluated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dataset = dir.path().join("fixtures.jsonl");
    std::fs::write(
        &dataset,
        concat!(
            r#"{"id": "flat", "prompt": "flat plane", "metric_spec": {"coords": ["x", "y"], "g_dd": [[1, 0], [0, 1]]}, "expected_checks": [{"check_name": "vacuum", "passed": true}]}"#,
            "\n\n",
            r#"{"id": "sphere", "prompt": "2-sphere", "metric_spec": {"coords": ["theta", "phi"], "g_dd": [["a**2", 0], [0, "a**2*sin(theta)**2"]]}, "expected_checks": [{"check_name": "vacuum", "passed": true}, {"check_name": "unit_check", "passed": true}]}"#,
            "\n"
        ),
    )
    .expect("write dataset");

    let records = FixtureRecord::load_jsonl(&dataset).expect("load");
    let orchestrator = Orchestrator::new(Arc::new(grtk_pipeline::LocalCapabilities), Duration::from_secs(60));
    let evaluation = evaluate_dataset(&records, &orchestrator, 0).await.expect("evaluate");

    assert_eq!(evaluation.summary.total, 2);
    assert_eq!(evaluation.summary.passed, 1);
    assert_eq!(evaluation.results[1].id, "sphere");
    // A 2-sphere has vanishing Einstein tensor; unit_check is never run.
    assert_eq!(evaluation.summary.failure_reasons.get("unit_check"), Some(&1));
    assert_eq!(evaluation.summary.failure_reasons.get("vacuum"), None);
}
