//! Typed view of the iperf3 report header.
//!
//! The interval records stay untyped until the record parser sees them;
//! only the `start` section, used for plot metadata, is deserialized here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decoded input report.
#[derive(Debug, Clone)]
pub struct Report {
    /// Input file stem, used to name output artifacts.
    pub name: String,
    /// The whole decoded document.
    pub document: Value,
    /// Test metadata from the `start` section.
    pub metadata: TestMetadata,
}

/// Metadata describing the test run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestMetadata {
    pub time: Option<String>,
    pub protocol: Option<String>,
    pub local_host: Option<String>,
    pub remote_host: Option<String>,
    pub num_streams: Option<u32>,
    pub duration: Option<f64>,
}

impl TestMetadata {
    /// Extract metadata from a report document. Unknown or malformed
    /// sections leave the corresponding fields empty.
    pub fn from_document(document: &Value) -> Self {
        let Some(start) = document.get("start") else {
            return Self::default();
        };
        let start: StartSection = serde_json::from_value(start.clone()).unwrap_or_default();
        let connected = start.connected.into_iter().next().unwrap_or_default();

        Self {
            time: start.timestamp.and_then(|t| t.time),
            protocol: start.test_start.as_ref().and_then(|t| t.protocol.clone()),
            local_host: connected.local_host,
            remote_host: connected.remote_host,
            num_streams: start.test_start.as_ref().and_then(|t| t.num_streams),
            duration: start.test_start.as_ref().and_then(|t| t.duration),
        }
    }
}

/// The `start` section of an iperf3 report.
#[derive(Debug, Clone, Default, Deserialize)]
struct StartSection {
    #[serde(default)]
    connected: Vec<Connected>,
    #[serde(default)]
    timestamp: Option<Timestamp>,
    #[serde(default)]
    test_start: Option<TestStart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Connected {
    #[serde(default)]
    local_host: Option<String>,
    #[serde(default)]
    remote_host: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Timestamp {
    #[serde(default)]
    time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TestStart {
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    num_streams: Option<u32>,
    #[serde(default)]
    duration: Option<f64>,
}
