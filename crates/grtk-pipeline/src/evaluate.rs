//! # Dataset Evaluation
//!
//! Runs the metric pipeline on every [`FixtureRecord`] and compares the
//! produced check verdicts with the record's expected ones. A check that
//! was expected but never produced is `missing`; one whose verdict differs
//! is a `mismatch`.

use std::collections::BTreeMap;

use grtk_core::FixtureRecord;
use serde::{Deserialize, Serialize};

use crate::dag::RunDag;
use crate::error::PipelineError;
use crate::orchestrator::Orchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureReason {
    Missing,
    Mismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    pub check: String,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryResult {
    pub id: String,
    pub prompt: String,
    pub passed: bool,
    pub failures: Vec<CheckFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Check name to the number of entries that failed on it.
    pub failure_reasons: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub summary: EvaluationSummary,
    pub results: Vec<EntryResult>,
}

/// Compare a finished run against a record's expectations.
///
/// When a check name appears more than once in the run, the last verdict
/// counts.
pub fn compare(record: &FixtureRecord, dag: &RunDag) -> EntryResult {
    let actual: BTreeMap<&str, bool> = dag
        .checks
        .iter()
        .map(|check| (check.check_name.as_str(), check.passed))
        .collect();
    let expected: BTreeMap<&str, bool> = record
        .expected_checks
        .iter()
        .map(|check| (check.check_name.as_str(), check.passed))
        .collect();

    let failures: Vec<CheckFailure> = expected
        .into_iter()
        .filter_map(|(name, expected)| {
            let reason = match actual.get(name) {
                None => FailureReason::Missing,
                Some(passed) if *passed != expected => FailureReason::Mismatch,
                Some(_) => return None,
            };
            Some(CheckFailure {
                check: name.to_string(),
                reason,
            })
        })
        .collect();

    EntryResult {
        id: record.id.clone(),
        prompt: record.prompt.clone(),
        passed: failures.is_empty(),
        failures,
    }
}

/// Evaluate `records`, or only the first `limit` of them when `limit` is
/// non-zero.
pub async fn evaluate_dataset(
    records: &[FixtureRecord],
    orchestrator: &Orchestrator,
    limit: usize,
) -> Result<Evaluation, PipelineError> {
    let selected = match limit {
        0 => records,
        n => &records[..n.min(records.len())],
    };

    let mut results = Vec::with_capacity(selected.len());
    let mut summary = EvaluationSummary::default();
    for record in selected {
        let dag = orchestrator.run_metric_pipeline(&record.metric_spec).await?;
        let result = compare(record, &dag);
        tracing::info!(id = %record.id, passed = result.passed, failures = result.failures.len(), "evaluated entry");

        summary.total += 1;
        if result.passed {
            summary.passed += 1;
        } else {
            summary.failed += 1;
            for failure in &result.failures {
                *summary.failure_reasons.entry(failure.check.clone()).or_default() += 1;
            }
        }
        results.push(result);
    }
    Ok(Evaluation { summary, results })
}
