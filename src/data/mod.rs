//! The measurement pipeline: interval records to plot-ready series.
//!
//! Every stage takes the previous stage's output plus its own options value
//! and returns new data; nothing is shared or mutated between stages.
//!
//! ## Submodules
//!
//! - [`interval`]: Record parser ([`parse_records`]) producing one
//!   [`DirectionSeries`] per direction and skip diagnostics
//! - [`align`]: Direction reconciler ([`reconcile`]) and gap filling
//! - [`derive`]: Metric deriver ([`derive_metrics`])
//! - [`series`]: Series builder ([`build_series`]) with shared throughput ranges
//!
//! ## Data Flow
//!
//! ```text
//! serde_json::Value (iperf3 report)
//!        │
//!        ▼
//! parse_records()  ──▶ ParsedRecords { sender, receiver, skipped }
//!        │
//!        ▼
//! reconcile()      ──▶ Vec<AlignedTimePoint>
//!        │
//!        ▼
//! derive_metrics() ──▶ DerivedMetrics (Reading per metric × direction × point)
//!        │
//!        ▼
//! build_series()   ──▶ Vec<MetricSeries>
//! ```

pub mod align;
pub mod derive;
pub mod interval;
pub mod series;

pub use align::{
    build_axis, fill_gaps, reconcile, AlignedTimePoint, Reading, Slot,
    DEFAULT_TIME_TOLERANCE_SECS,
};
pub use derive::{derive_metrics, round_to, DeriveOptions, DerivedLine, DerivedMetrics, Metric, MetricSelection};
pub use interval::{
    parse_records, Direction, DirectionSeries, EntryTally, IntervalSample, ParseOptions,
    ParsedRecords, SkippedEntry,
};
pub use series::{build_series, AxisRange, MetricSeries, SeriesOptions, SeriesPoint};
