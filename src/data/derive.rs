//! Metric derivation per aligned time point.

use std::fmt;

use serde::Serialize;

use super::align::{fill_gaps, AlignedTimePoint, Reading, Slot};
use super::interval::{Direction, IntervalSample};

/// A tracked metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Bytes transferred per interval.
    Bytes,
    /// Bitrate in bits per second.
    Throughput,
    /// Lost packets as a percentage of packets sent.
    PacketLoss,
    /// Jitter in milliseconds.
    Jitter,
}

impl Metric {
    /// All metrics in plotting order.
    pub const ALL: [Metric; 4] = [
        Metric::Bytes,
        Metric::Throughput,
        Metric::PacketLoss,
        Metric::Jitter,
    ];

    /// File name key, e.g. `packetLoss`.
    pub fn key(&self) -> &'static str {
        match self {
            Metric::Bytes => "bytes",
            Metric::Throughput => "throughput",
            Metric::PacketLoss => "packetLoss",
            Metric::Jitter => "jitter",
        }
    }

    /// File name key after a direction prefix, e.g. `senderPacketLoss`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Metric::Bytes => "Bytes",
            Metric::Throughput => "Throughput",
            Metric::PacketLoss => "PacketLoss",
            Metric::Jitter => "Jitter",
        }
    }

    /// Plot title, optionally naming a single direction.
    pub fn title(&self, direction: Option<Direction>) -> String {
        let who = direction.map(|d| format!("{} ", d.title())).unwrap_or_default();
        match self {
            Metric::Bytes => format!("Network Throughput: {who}Bytes Over Time"),
            Metric::Throughput => format!("Network Throughput: {who}Bitrate Over Time"),
            Metric::PacketLoss => {
                format!("Network Quality: {who}Packet Loss Percentage Over Time")
            }
            Metric::Jitter => format!("Network Quality: {who}Jitter Measurements Over Time"),
        }
    }

    /// Y-axis label.
    pub fn y_label(&self) -> &'static str {
        match self {
            Metric::Bytes => "Bytes",
            Metric::Throughput => "Bits per second",
            Metric::PacketLoss => "Packet Loss (%)",
            Metric::Jitter => "Jitter (ms)",
        }
    }

    /// Whether the metric belongs to the throughput family, which may share
    /// one y-axis range across directions.
    pub fn is_throughput(&self) -> bool {
        matches!(self, Metric::Bytes | Metric::Throughput)
    }

    /// Compute the metric for one interval.
    pub fn evaluate(&self, sample: &IntervalSample) -> Reading {
        match self {
            Metric::Bytes => Reading::Value(sample.bytes as f64),
            Metric::Throughput => Reading::Value(
                sample
                    .bits_per_second
                    .unwrap_or_else(|| sample.bytes as f64 * 8.0 / sample.duration()),
            ),
            Metric::PacketLoss => match (sample.packets, sample.lost_packets) {
                (Some(sent), Some(lost)) if sent > 0 => {
                    Reading::Value(lost as f64 / sent as f64 * 100.0)
                }
                _ => Reading::Undefined,
            },
            Metric::Jitter => sample.jitter_ms.map_or(Reading::Undefined, Reading::Value),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Metric::Bytes => "bytes",
            Metric::Throughput => "throughput",
            Metric::PacketLoss => "packet loss",
            Metric::Jitter => "jitter",
        })
    }
}

/// The enabled (metric, direction) pairs, in plotting order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricSelection {
    pairs: Vec<(Metric, Direction)>,
}

impl MetricSelection {
    /// Build a selection; pairs are sorted and deduplicated.
    pub fn new(pairs: impl IntoIterator<Item = (Metric, Direction)>) -> Self {
        let mut pairs: Vec<_> = pairs.into_iter().collect();
        pairs.sort();
        pairs.dedup();
        Self { pairs }
    }

    /// Every metric for both directions.
    pub fn all() -> Self {
        Self::new(
            Metric::ALL
                .into_iter()
                .flat_map(|m| Direction::ALL.into_iter().map(move |d| (m, d))),
        )
    }

    pub fn contains(&self, metric: Metric, direction: Direction) -> bool {
        self.pairs.contains(&(metric, direction))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, Direction)> + '_ {
        self.pairs.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// Options for the metric deriver.
#[derive(Debug, Clone, Copy)]
pub struct DeriveOptions {
    /// Decimal places kept on every derived value.
    pub precision_digits: u32,
    /// Fill interior gaps by linear interpolation.
    pub interpolate_missing: bool,
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self {
            precision_digits: 6,
            interpolate_missing: false,
        }
    }
}

/// Derived readings for one (metric, direction) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedLine {
    pub metric: Metric,
    pub direction: Direction,
    /// One reading per aligned time point.
    pub readings: Vec<Reading>,
}

/// All derived lines over the shared axis.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetrics {
    pub times: Vec<f64>,
    pub lines: Vec<DerivedLine>,
}

/// Compute every selected metric at every aligned point.
///
/// Gaps are filled first (when enabled), then all values are rounded to
/// `precision_digits` once.
pub fn derive_metrics(
    points: &[AlignedTimePoint],
    selection: &MetricSelection,
    options: &DeriveOptions,
) -> DerivedMetrics {
    let times: Vec<f64> = points.iter().map(|p| p.time).collect();

    let lines = selection
        .iter()
        .map(|(metric, direction)| {
            let raw: Vec<Reading> = points
                .iter()
                .map(|point| match point.slot(direction) {
                    Slot::Observed(sample) => metric.evaluate(sample),
                    Slot::Missing => Reading::Gap,
                })
                .collect();

            let filled = if options.interpolate_missing {
                fill_gaps(&times, &raw)
            } else {
                raw
            };

            let readings = filled
                .into_iter()
                .map(|reading| match reading {
                    Reading::Value(v) => Reading::Value(round_to(v, options.precision_digits)),
                    other => other,
                })
                .collect();

            DerivedLine {
                metric,
                direction,
                readings,
            }
        })
        .collect();

    DerivedMetrics { times, lines }
}

/// Round to a number of decimal places.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let scale = 10f64.powi(digits.min(15) as i32);
    let scaled = value * scale;
    if scaled.is_finite() {
        scaled.round() / scale
    } else {
        value
    }
}
