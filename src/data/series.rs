//! Series assembly: named, equal-length plot lines with y-axis ranges.

use std::collections::BTreeMap;

use serde::Serialize;

use super::align::Reading;
use super::derive::{DerivedMetrics, Metric};
use super::interval::Direction;
use crate::error::{Error, Result};

/// Closed value range of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Range of the given values, `None` when there are none.
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().fold(None, |range, v| {
            Some(match range {
                None => AxisRange::new(v, v),
                Some(r) => AxisRange::new(r.min.min(v), r.max.max(v)),
            })
        })
    }

    /// Smallest range covering both.
    pub fn union(self, other: AxisRange) -> AxisRange {
        AxisRange::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Widen a zero-width range so it can be drawn.
    pub fn padded(&self) -> AxisRange {
        if self.span() > 0.0 {
            return *self;
        }
        let pad = if self.min == 0.0 { 1.0 } else { self.min.abs() * 0.1 };
        AxisRange::new(self.min - pad, self.max + pad)
    }
}

/// One time point of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub time: f64,
    pub reading: Reading,
}

/// A plot line for one metric and one direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub metric: Metric,
    pub direction: Direction,
    /// Display name, e.g. `sender bytes`.
    pub name: String,
    /// One point per aligned time point, missing ones included.
    pub points: Vec<SeriesPoint>,
    /// Y-axis range; `None` when no point has a value.
    pub range: Option<AxisRange>,
}

impl MetricSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether at least one point carries a value.
    pub fn has_values(&self) -> bool {
        self.points.iter().any(|p| p.reading.is_present())
    }

    /// Points with a value, in time order.
    pub fn present_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points
            .iter()
            .filter_map(|p| p.reading.value().map(|v| (p.time, v)))
    }

    /// Time span covered by the shared axis.
    pub fn time_range(&self) -> Option<AxisRange> {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => Some(AxisRange::new(first.time, last.time)),
            _ => None,
        }
    }
}

/// Options for the series builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesOptions {
    /// Give both directions of a throughput metric one shared y range.
    pub consistent_throughput_yaxis: bool,
}

/// Assemble one series per derived line.
///
/// Fails with [`Error::EmptySeries`] when the axis has no points, naming the
/// first requested metric/direction.
pub fn build_series(derived: &DerivedMetrics, options: &SeriesOptions) -> Result<Vec<MetricSeries>> {
    if derived.times.is_empty() {
        if let Some(line) = derived.lines.first() {
            return Err(Error::EmptySeries {
                metric: line.metric,
                direction: line.direction,
            });
        }
    }

    let mut series: Vec<MetricSeries> = derived
        .lines
        .iter()
        .map(|line| {
            let points: Vec<SeriesPoint> = derived
                .times
                .iter()
                .zip(&line.readings)
                .map(|(&time, &reading)| SeriesPoint { time, reading })
                .collect();
            let range = AxisRange::of(points.iter().filter_map(|p| p.reading.value()));
            MetricSeries {
                metric: line.metric,
                direction: line.direction,
                name: format!("{} {}", line.direction, line.metric),
                points,
                range,
            }
        })
        .collect();

    if options.consistent_throughput_yaxis {
        share_throughput_ranges(&mut series);
    }

    Ok(series)
}

fn share_throughput_ranges(series: &mut [MetricSeries]) {
    let mut shared: BTreeMap<Metric, AxisRange> = BTreeMap::new();
    for s in series.iter().filter(|s| s.metric.is_throughput()) {
        if let Some(range) = s.range {
            shared
                .entry(s.metric)
                .and_modify(|r| *r = r.union(range))
                .or_insert(range);
        }
    }

    for s in series.iter_mut() {
        if let Some(range) = shared.get(&s.metric) {
            s.range = Some(*range);
        }
    }
}
