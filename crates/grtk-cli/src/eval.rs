//! # Eval Subcommand
//!
//! Runs every record of a JSONL fixture dataset through the metric
//! pipeline and writes `{summary, results}`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use grtk_core::FixtureRecord;
use grtk_pipeline::evaluate_dataset;

use crate::output::write_json;
use crate::TargetArgs;

/// Arguments for the eval subcommand.
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Path to the JSONL dataset.
    #[arg(long)]
    pub dataset: PathBuf,

    /// Evaluate only the first N records; 0 evaluates all.
    #[arg(long, default_value_t = 0)]
    pub limit: usize,

    /// Summary path, or `-` for stdout.
    #[arg(long, default_value = "-")]
    pub out: String,

    /// Exit with status 2 when any record fails.
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Execute the eval subcommand.
pub fn run_eval(args: &EvalArgs) -> Result<u8> {
    let records = FixtureRecord::load_jsonl(&args.dataset)
        .with_context(|| format!("failed to load dataset: {}", args.dataset.display()))?;
    tracing::info!(records = records.len(), limit = args.limit, "loaded dataset");

    let orchestrator = args.target.orchestrator()?;
    let evaluation = crate::runtime()?.block_on(evaluate_dataset(&records, &orchestrator, args.limit))?;

    let summary = &evaluation.summary;
    tracing::info!(
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        "evaluation finished"
    );
    write_json(&evaluation, &args.out)?;

    Ok(if args.strict && summary.failed > 0 { 2 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn write_dataset(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("fixtures.jsonl");
        let lines = [
            json!({
                "id": "flat-2d",
                "prompt": "Check 2D Minkowski space.",
                "metric_spec": {"coords": ["t", "x"], "g_dd": [[-1, 0], [0, 1]]},
                "expected_checks": [{"check_name": "vacuum", "passed": true}]
            }),
            json!({
                "id": "frw",
                "prompt": "Is a flat FRW universe a vacuum solution?",
                "metric_spec": {
                    "coords": ["t", "x", "y", "z"],
                    "g_dd": [[-1, 0, 0, 0], [0, "a(t)**2", 0, 0], [0, 0, "a(t)**2", 0], [0, 0, 0, "a(t)**2"]]
                },
                "expected_checks": [{"check_name": "vacuum", "passed": true}]
            }),
        ];
        let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
        std::fs::write(&path, text).unwrap();
        path
    }

    fn local_args(dataset: PathBuf, out: PathBuf, limit: usize, strict: bool) -> EvalArgs {
        EvalArgs {
            dataset,
            limit,
            out: out.to_string_lossy().into_owned(),
            strict,
            target: TargetArgs {
                local: true,
                ..TargetArgs::default()
            },
        }
    }

    #[test]
    fn summarizes_mismatches() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = write_dataset(dir.path());
        let out = dir.path().join("summary.json");

        let code = run_eval(&local_args(dataset, out.clone(), 0, true)).unwrap();
        assert_eq!(code, 2);

        let summary: Value = serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(summary["summary"]["total"], 2);
        assert_eq!(summary["summary"]["passed"], 1);
        assert_eq!(summary["summary"]["failure_reasons"], json!({"vacuum": 1}));
        assert_eq!(summary["results"][1]["failures"][0]["reason"], "mismatch");
    }

    #[test]
    fn limit_selects_leading_records() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = write_dataset(dir.path());
        let out = dir.path().join("summary.json");

        let code = run_eval(&local_args(dataset, out.clone(), 1, true)).unwrap();
        assert_eq!(code, 0);

        let summary: Value = serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(summary["summary"]["total"], 1);
        assert_eq!(summary["results"][0]["id"], "flat-2d");
    }

    #[test]
    fn malformed_dataset_names_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("bad.jsonl");
        std::fs::write(&dataset, "{\"id\": \"ok\", \"prompt\": \"\", \"metric_spec\": {}}\nnot json\n").unwrap();
        let err = run_eval(&local_args(dataset, dir.path().join("o.json"), 0, false)).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }
}
