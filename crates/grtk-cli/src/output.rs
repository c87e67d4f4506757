//! JSON output to stdout or a file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Pretty-print `value` to `out`; `-` or an empty string means stdout.
pub fn write_json<T: Serialize>(value: &T, out: &str) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    if out.is_empty() || out == "-" {
        println!("{text}");
        return Ok(());
    }
    let path = Path::new(out);
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_pretty_json_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&json!({"passed": true}), path.to_str().unwrap()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"passed\": true\n}");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.json");
        assert!(write_json(&json!({}), path.to_str().unwrap()).is_err());
    }
}
