//! File-based report loading.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use super::report::{Report, TestMetadata};

/// Read and decode an iperf3 JSON report.
///
/// The file stem names the report's output artifacts.
pub fn load_report(path: &Path) -> Result<Report> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    parse_report(&content, name).with_context(|| format!("invalid report {}", path.display()))
}

/// Decode a report from a JSON string.
pub fn parse_report(content: &str, name: impl Into<String>) -> Result<Report> {
    let document: Value = serde_json::from_str(content).context("parse error")?;

    match document.get("intervals") {
        Some(Value::Array(_)) => {}
        Some(_) => bail!("'intervals' section is not a list"),
        None => bail!("missing 'intervals' section"),
    }

    let metadata = TestMetadata::from_document(&document);
    Ok(Report {
        name: name.into(),
        document,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"{
            "start": { "test_start": { "protocol": "UDP" } },
            "intervals": [
                { "streams": [
                    { "start": 0, "end": 1.000043, "bytes": 131072, "sender": true }
                ] }
            ]
        }"#
    }

    #[test]
    fn loads_report_named_after_file_stem() {
        let mut file = tempfile::Builder::new()
            .prefix("bidir_run")
            .suffix(".json")
            .tempfile()
            .unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let report = load_report(file.path()).unwrap();

        assert!(report.name.starts_with("bidir_run"));
        assert!(!report.name.ends_with(".json"));
        assert_eq!(report.metadata.protocol.as_deref(), Some("UDP"));
        assert_eq!(report.document["intervals"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_report(Path::new("/nonexistent/path/data.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let err = load_report(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parse error"));
    }

    #[test]
    fn missing_intervals_is_rejected() {
        let err = parse_report(r#"{"start": {}}"#, "x").unwrap_err();
        assert!(err.to_string().contains("missing 'intervals'"));
    }

    #[test]
    fn non_list_intervals_is_rejected() {
        let err = parse_report(r#"{"intervals": {}}"#, "x").unwrap_err();
        assert!(err.to_string().contains("not a list"));
    }
}
