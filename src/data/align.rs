//! Direction reconciliation onto a shared time axis.
//!
//! The two directions of a bidirectional test report their intervals
//! independently. Their start times are merged into one axis (union, not
//! intersection, so every observed sample reaches the plot) and each
//! direction is looked up at every axis point.

use serde::Serialize;

use super::interval::{Direction, DirectionSeries, IntervalSample};

/// Default tolerance for merging near-equal timestamps, in seconds.
///
/// iperf3 reports interval boundaries with microsecond noise
/// (`1.000043`, `1.000051`); anything closer than this is one point.
pub const DEFAULT_TIME_TOLERANCE_SECS: f64 = 0.01;

/// What one direction contributes at an aligned time point.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// An interval of this direction covers the point.
    Observed(IntervalSample),
    /// No interval of this direction covers the point.
    Missing,
}

impl Slot {
    pub fn sample(&self) -> Option<&IntervalSample> {
        match self {
            Slot::Observed(sample) => Some(sample),
            Slot::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Slot::Missing)
    }
}

/// One row of the reconciled series.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTimePoint {
    /// Seconds since test start.
    pub time: f64,
    pub sender: Slot,
    pub receiver: Slot,
}

impl AlignedTimePoint {
    pub fn slot(&self, direction: Direction) -> &Slot {
        match direction {
            Direction::Sender => &self.sender,
            Direction::Receiver => &self.receiver,
        }
    }
}

/// A derived value at one time point.
///
/// Missing data is a tagged state so that interpolation and axis ranges
/// never see a placeholder number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reading {
    Value(f64),
    /// The direction had no interval at this point. May be interpolated.
    Gap,
    /// The metric cannot be computed here (e.g. zero packets sent).
    Undefined,
}

impl Reading {
    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(*v),
            Reading::Gap | Reading::Undefined => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Reading::Value(_))
    }
}

/// Build the shared axis: union of start times, sorted, with starts within
/// `tolerance` of the previous axis point merged into it. Equal starts are
/// always merged, so a zero tolerance still yields a strictly increasing
/// axis.
pub fn build_axis(sender: &DirectionSeries, receiver: &DirectionSeries, tolerance: f64) -> Vec<f64> {
    let mut starts: Vec<f64> = sender
        .iter()
        .chain(receiver.iter())
        .map(|sample| sample.start)
        .collect();
    starts.sort_by(f64::total_cmp);

    let mut axis: Vec<f64> = Vec::with_capacity(starts.len());
    for start in starts {
        match axis.last() {
            Some(&last) if start - last <= tolerance => {}
            _ => axis.push(start),
        }
    }
    axis
}

/// Align both directions on the union of their start times.
pub fn reconcile(
    sender: &DirectionSeries,
    receiver: &DirectionSeries,
    tolerance: f64,
) -> Vec<AlignedTimePoint> {
    build_axis(sender, receiver, tolerance)
        .into_iter()
        .map(|time| AlignedTimePoint {
            time,
            sender: lookup(sender, time, tolerance),
            receiver: lookup(receiver, time, tolerance),
        })
        .collect()
}

/// Prefer an interval starting at `time` (within tolerance), then one whose
/// window contains it.
fn lookup(series: &DirectionSeries, time: f64, tolerance: f64) -> Slot {
    series
        .iter()
        .find(|sample| (sample.start - time).abs() <= tolerance)
        .or_else(|| series.iter().find(|sample| sample.covers(time)))
        .map_or(Slot::Missing, |sample| Slot::Observed(sample.clone()))
}

/// Fill interior gaps by linear interpolation in time.
///
/// A [`Reading::Gap`] is replaced when a present value exists on both sides;
/// gaps at either end stay gaps. [`Reading::Undefined`] is never filled.
pub fn fill_gaps(times: &[f64], readings: &[Reading]) -> Vec<Reading> {
    debug_assert_eq!(times.len(), readings.len());

    readings
        .iter()
        .enumerate()
        .map(|(i, reading)| {
            if *reading != Reading::Gap {
                return *reading;
            }
            let before = (0..i)
                .rev()
                .find_map(|j| readings[j].value().map(|v| (times[j], v)));
            let after = (i + 1..readings.len())
                .find_map(|k| readings[k].value().map(|v| (times[k], v)));

            match (before, after) {
                (Some((t0, v0)), Some((t1, v1))) if t1 > t0 => {
                    Reading::Value(v0 + (v1 - v0) * (times[i] - t0) / (t1 - t0))
                }
                _ => Reading::Gap,
            }
        })
        .collect()
}
