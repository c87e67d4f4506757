//! # Run Subcommand
//!
//! Reads a metric JSON file, runs the standard twelve-step pipeline and
//! writes the run report.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use grtk_pipeline::{build_report, Orchestrator, RunReport};

use crate::output::write_json;
use crate::TargetArgs;

/// Arguments for the run subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the metric JSON input.
    #[arg(long)]
    pub metric_json: PathBuf,

    /// Report path, or `-` for stdout.
    #[arg(long, default_value = "-")]
    pub out: String,

    /// Exit with status 2 when any check fails.
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Execute the run subcommand.
pub fn run_pipeline(args: &RunArgs) -> Result<u8> {
    let metric = read_metric(&args.metric_json)?;
    let orchestrator = args.target.orchestrator()?;
    let report = crate::runtime()?.block_on(report_for(&orchestrator, &metric))?;

    tracing::info!(
        checks = report.checks.len(),
        failed = report.failed_checks.len(),
        passed = report.passed,
        "pipeline finished"
    );
    write_json(&report, &args.out)?;

    Ok(if args.strict && !report.passed { 2 } else { 0 })
}

fn read_metric(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read metric file: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Run the metric pipeline and build its report.
pub async fn report_for(orchestrator: &Orchestrator, metric: &Value) -> Result<RunReport> {
    let dag = orchestrator.run_metric_pipeline(metric).await?;
    Ok(build_report(metric, &dag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn local_args(metric_json: PathBuf, out: PathBuf, strict: bool) -> RunArgs {
        RunArgs {
            metric_json,
            out: out.to_string_lossy().into_owned(),
            strict,
            target: TargetArgs {
                local: true,
                ..TargetArgs::default()
            },
        }
    }

    #[test]
    fn writes_report_for_flat_metric() {
        let dir = tempfile::tempdir().unwrap();
        let metric = dir.path().join("flat.json");
        let out = dir.path().join("report.json");
        std::fs::write(
            &metric,
            json!({"coords": ["t", "x"], "g_dd": [[-1, 0], [0, 1]]}).to_string(),
        )
        .unwrap();

        let code = run_pipeline(&local_args(metric, out.clone(), true)).unwrap();
        assert_eq!(code, 0);

        let report: Value = serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(report["passed"], true);
        assert_eq!(report["assumptions"]["coords"], json!(["t", "x"]));
        assert_eq!(report["assumptions"]["signature"], "-+++");
        assert!(report["artifacts"].as_array().unwrap().iter().any(|a| a == "riemann"));
    }

    #[test]
    fn strict_mode_flags_failed_checks() {
        let dir = tempfile::tempdir().unwrap();
        let metric = dir.path().join("frw.json");
        let out = dir.path().join("report.json");
        std::fs::write(
            &metric,
            json!({
                "coords": ["t", "x", "y", "z"],
                "g_dd": [[-1, 0, 0, 0], [0, "a(t)**2", 0, 0], [0, 0, "a(t)**2", 0], [0, 0, 0, "a(t)**2"]]
            })
            .to_string(),
        )
        .unwrap();

        assert_eq!(run_pipeline(&local_args(metric.clone(), out.clone(), false)).unwrap(), 0);
        assert_eq!(run_pipeline(&local_args(metric, out.clone(), true)).unwrap(), 2);

        let report: Value = serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(report["passed"], false);
        assert!(report["failed_checks"]
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c["check_name"] == "vacuum"));
    }

    #[test]
    fn unreadable_metric_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = local_args(dir.path().join("missing.json"), dir.path().join("out.json"), false);
        let err = run_pipeline(&args).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read metric file"));
    }

    #[test]
    fn non_object_metric_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let metric = dir.path().join("list.json");
        std::fs::write(&metric, "[1, 2]").unwrap();
        let args = local_args(metric, dir.path().join("out.json"), false);
        assert!(run_pipeline(&args).is_err());
    }
}
