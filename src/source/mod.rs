//! Input reports.
//!
//! Reads iperf3 `--json` output from disk. The document is kept as a
//! [`serde_json::Value`] for the record parser; the `start` section is
//! decoded into [`TestMetadata`] for plot headers.

mod file;
mod report;

pub use file::{load_report, parse_report};
pub use report::{Report, TestMetadata};
