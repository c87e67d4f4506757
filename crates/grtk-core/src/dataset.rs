//! # Fixture Records
//!
//! Line-delimited JSON records used to evaluate the metric pipeline against
//! expected check verdicts. Blank lines are skipped on read; each record is
//! written on its own line.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DatasetError;

/// An expected verdict for one named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedCheck {
    pub check_name: String,
    pub passed: bool,
}

/// One evaluation fixture.
///
/// `metric_spec` is kept as raw JSON: it may carry pipeline extras such as
/// `vacuum_sample_points` next to the metric fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRecord {
    pub id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub conventions: BTreeMap<String, String>,
    pub metric_spec: Value,
    #[serde(default)]
    pub expected_tools: Vec<String>,
    #[serde(default)]
    pub expected_checks: Vec<ExpectedCheck>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FixtureRecord {
    /// Parse records from JSONL text.
    pub fn parse_jsonl(text: &str) -> Result<Vec<Self>, DatasetError> {
        let mut records = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record = serde_json::from_str(line).map_err(|source| DatasetError::Json {
                line: index + 1,
                source,
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Read records from a JSONL file.
    pub fn load_jsonl(path: &Path) -> Result<Vec<Self>, DatasetError> {
        let text = fs::read_to_string(path)?;
        Self::parse_jsonl(&text)
    }

    /// Write records to a JSONL file, one per line.
    pub fn write_jsonl(path: &Path, records: &[Self]) -> Result<(), DatasetError> {
        let mut file = fs::File::create(path)?;
        for record in records {
            let line = serde_json::to_string(record)?;
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")?;
        }
        Ok(())
    }
}
