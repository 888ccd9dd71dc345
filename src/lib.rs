//! # iperf-plot
//!
//! Turns the JSON report of a bidirectional iperf3 UDP test into ASCII line
//! graphs, one per tracked metric and direction.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              app                                 │
//! │  ┌────────┐   ┌──────────────────────────┐   ┌────────────────┐  │
//! │  │ source │──▶│           data           │──▶│     render     │  │
//! │  │ (JSON) │   │ parse ▸ align ▸ derive ▸ │   │ request ▸      │  │
//! │  └────────┘   │ series                   │   │ backend ▸      │  │
//! │               └──────────────────────────┘   │ decorate       │  │
//! │                                              └───────┬────────┘  │
//! │  ┌────────┐                                          ▼           │
//! │  │ config │ Settings for every stage          output (.txt/.json)│
//! │  └────────┘                                                      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: Loads a report and its test metadata
//! - **[`data`]**: The measurement pipeline, from raw interval entries to
//!   equal-length [`MetricSeries`] on one shared time axis
//! - **[`render`]**: [`RenderRequest`] building, the [`RenderBackend`] trait
//!   with a built-in ratatui backend and a gnuplot backend, and text decoration
//! - **[`app`]**: Runs the pipeline for one report and lays out plots
//! - **[`output`]**: Writes plots and series exports
//! - **[`config`]**: [`Settings`] from a file and `IPERF_PLOT_*` variables
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Plot the default input with config.toml settings
//! iperf-plot
//!
//! # Plot two reports into a custom directory with gnuplot
//! iperf-plot run1.json run2.json -o graphs --backend gnuplot
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::path::Path;
//! use iperf_plot::{output, App, Settings};
//!
//! # fn main() -> anyhow::Result<()> {
//! let settings = Settings::load(Path::new("config.toml"))?;
//! let app = App::new(settings);
//! let run = app.run(Path::new("data/data.json"))?;
//! output::write_plots(Path::new("graphs_ascii"), &run.plots)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Driving the pipeline directly
//!
//! ```
//! use iperf_plot::data::{
//!     build_series, derive_metrics, parse_records, reconcile, DeriveOptions, MetricSelection,
//!     ParseOptions, SeriesOptions, DEFAULT_TIME_TOLERANCE_SECS,
//! };
//! use serde_json::json;
//!
//! let report = json!({ "intervals": [{ "streams": [
//!     { "start": 0.0, "end": 1.0, "bytes": 1000, "packets": 10, "lost_packets": 1,
//!       "jitter_ms": 0.2, "sender": true },
//!     { "start": 0.0, "end": 1.0, "bytes": 900, "packets": 9, "lost_packets": 0,
//!       "jitter_ms": 0.3, "sender": false },
//! ] }] });
//!
//! let records = parse_records(&report, &ParseOptions::default()).unwrap();
//! let points = reconcile(&records.sender, &records.receiver, DEFAULT_TIME_TOLERANCE_SECS);
//! let derived = derive_metrics(&points, &MetricSelection::all(), &DeriveOptions::default());
//! let series = build_series(&derived, &SeriesOptions::default()).unwrap();
//!
//! assert_eq!(series.len(), 8);
//! assert!(series.iter().all(|s| s.len() == 1));
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod output;
pub mod render;
pub mod source;

// Re-export main types for convenience
pub use app::{App, Diagnostics, Plot, RunOutput};
pub use config::Settings;
pub use data::{
    AlignedTimePoint, AxisRange, Direction, DirectionSeries, IntervalSample, Metric,
    MetricSeries, Reading, Slot,
};
pub use error::{EntryRef, Error, MalformedReason, RenderError, Result};
pub use render::{BackendKind, ChartBackend, GnuplotBackend, RenderBackend, RenderRequest};
pub use source::{load_report, Report, TestMetadata};
