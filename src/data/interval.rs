//! Record parsing: raw iperf3 interval entries to typed samples.
//!
//! This is the only place where the loosely typed JSON document is
//! inspected. Every stream object under `intervals[].streams[]` is either
//! turned into an [`IntervalSample`] for its direction or rejected with a
//! [`MalformedReason`].

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{EntryRef, Error, MalformedReason, Result};

/// One of the two flows of a bidirectional test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Client to server (`"sender": true`).
    Sender,
    /// Server to client (`"sender": false`).
    Receiver,
}

impl Direction {
    /// Both directions, sender first.
    pub const ALL: [Direction; 2] = [Direction::Sender, Direction::Receiver];

    /// Label used in legends, file names and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Sender => "sender",
            Direction::Receiver => "receiver",
        }
    }

    /// Capitalized label for titles.
    pub fn title(&self) -> &'static str {
        match self {
            Direction::Sender => "Sender",
            Direction::Receiver => "Receiver",
        }
    }

    fn from_sender_flag(sender: bool) -> Self {
        if sender {
            Direction::Sender
        } else {
            Direction::Receiver
        }
    }

    fn slot(&self) -> usize {
        match self {
            Direction::Sender => 0,
            Direction::Receiver => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One measurement interval for one direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalSample {
    /// Interval start, seconds since test start.
    pub start: f64,
    /// Interval end, seconds since test start. Always after `start`.
    pub end: f64,
    /// Bytes transferred during the interval.
    pub bytes: u64,
    /// Reported bitrate in bits per second.
    pub bits_per_second: Option<f64>,
    /// Packets sent (UDP only).
    pub packets: Option<u64>,
    /// Packets lost (UDP only). Never above `packets`.
    pub lost_packets: Option<u64>,
    /// Jitter in milliseconds (UDP receiver side only).
    pub jitter_ms: Option<f64>,
}

impl IntervalSample {
    /// Length of the interval in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `time` falls inside `[start, end)`.
    pub fn covers(&self, time: f64) -> bool {
        self.start <= time && time < self.end
    }

    /// Merge the samples of parallel streams that share one interval.
    ///
    /// Counters and rates are summed; an optional counter stays present only
    /// if every stream reported it. Jitter is averaged over the streams that
    /// report it. Returns `None` for an empty slice.
    pub fn combine(samples: &[IntervalSample]) -> Option<IntervalSample> {
        let (first, rest) = samples.split_first()?;
        if rest.is_empty() {
            return Some(first.clone());
        }

        let start = samples.iter().map(|s| s.start).fold(f64::INFINITY, f64::min);
        let end = samples.iter().map(|s| s.end).fold(f64::NEG_INFINITY, f64::max);
        let bytes = samples.iter().map(|s| s.bytes).sum();
        let bits_per_second = samples.iter().map(|s| s.bits_per_second).sum::<Option<f64>>();
        let packets = samples.iter().map(|s| s.packets).sum::<Option<u64>>();
        let lost_packets = samples.iter().map(|s| s.lost_packets).sum::<Option<u64>>();

        let jitters: Vec<f64> = samples.iter().filter_map(|s| s.jitter_ms).collect();
        let jitter_ms = if jitters.is_empty() {
            None
        } else {
            Some(jitters.iter().sum::<f64>() / jitters.len() as f64)
        };

        Some(IntervalSample {
            start,
            end,
            bytes,
            bits_per_second,
            packets,
            lost_packets,
            jitter_ms,
        })
    }
}

/// Ordered samples of one direction.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionSeries {
    pub direction: Direction,
    pub samples: Vec<IntervalSample>,
}

impl DirectionSeries {
    /// Create an empty series.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            samples: Vec::new(),
        }
    }

    /// Create a series from samples already in order.
    pub fn from_samples(direction: Direction, samples: Vec<IntervalSample>) -> Self {
        Self { direction, samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IntervalSample> {
        self.samples.iter()
    }

    /// Number of places where an interval does not start where the
    /// previous one ended (within `tolerance` seconds).
    pub fn gaps(&self, tolerance: f64) -> usize {
        self.samples
            .windows(2)
            .filter(|pair| (pair[1].start - pair[0].end).abs() > tolerance)
            .count()
    }
}

/// Options for the record parser.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Skip malformed entries instead of failing.
    pub skip_malformed: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            skip_malformed: true,
        }
    }
}

/// A rejected entry, recorded when skipping is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntry {
    pub entry: EntryRef,
    pub reason: MalformedReason,
}

/// Entry counts for one direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntryTally {
    /// Entries classified to this direction.
    pub total: usize,
    /// Entries that produced a sample.
    pub kept: usize,
}

impl EntryTally {
    pub fn skipped(&self) -> usize {
        self.total - self.kept
    }
}

/// Output of the record parser.
#[derive(Debug, Clone)]
pub struct ParsedRecords {
    pub sender: DirectionSeries,
    pub receiver: DirectionSeries,
    /// Rejected entries in input order.
    pub skipped: Vec<SkippedEntry>,
    tallies: [EntryTally; 2],
    /// Entries whose direction could not be determined.
    pub unclassified: usize,
}

impl ParsedRecords {
    /// The series of one direction.
    pub fn series(&self, direction: Direction) -> &DirectionSeries {
        match direction {
            Direction::Sender => &self.sender,
            Direction::Receiver => &self.receiver,
        }
    }

    /// Entry counts of one direction.
    pub fn tally(&self, direction: Direction) -> EntryTally {
        self.tallies[direction.slot()]
    }

    /// All entries seen, classified or not.
    pub fn total(&self) -> usize {
        self.tallies.iter().map(|t| t.total).sum::<usize>() + self.unclassified
    }

    /// All entries that produced a sample.
    pub fn kept(&self) -> usize {
        self.tallies.iter().map(|t| t.kept).sum()
    }
}

/// Accumulates samples and diagnostics while walking the document.
struct RecordsBuilder {
    options: ParseOptions,
    samples: [Vec<IntervalSample>; 2],
    skipped: Vec<SkippedEntry>,
    tallies: [EntryTally; 2],
    unclassified: usize,
}

impl RecordsBuilder {
    fn new(options: ParseOptions) -> Self {
        Self {
            options,
            samples: [Vec::new(), Vec::new()],
            skipped: Vec::new(),
            tallies: [EntryTally::default(); 2],
            unclassified: 0,
        }
    }

    /// Claim the next per-direction index for an entry.
    fn claim(&mut self, direction: Direction) -> usize {
        let tally = &mut self.tallies[direction.slot()];
        tally.total += 1;
        tally.total - 1
    }

    fn claim_unclassified(&mut self) -> usize {
        self.unclassified += 1;
        self.unclassified - 1
    }

    fn keep(&mut self, direction: Direction) {
        self.tallies[direction.slot()].kept += 1;
    }

    fn reject(&mut self, entry: EntryRef, reason: MalformedReason) -> Result<()> {
        if !self.options.skip_malformed {
            return Err(Error::MalformedInput { entry, reason });
        }
        self.skipped.push(SkippedEntry { entry, reason });
        Ok(())
    }

    fn push(&mut self, direction: Direction, sample: IntervalSample) {
        self.samples[direction.slot()].push(sample);
    }

    fn finish(self) -> ParsedRecords {
        let [sender, receiver] = self.samples;
        ParsedRecords {
            sender: DirectionSeries::from_samples(Direction::Sender, sender),
            receiver: DirectionSeries::from_samples(Direction::Receiver, receiver),
            skipped: self.skipped,
            tallies: self.tallies,
            unclassified: self.unclassified,
        }
    }
}

/// Parse every interval entry of a decoded iperf3 report.
///
/// A document without an `intervals` array yields two empty series.
pub fn parse_records(document: &Value, options: &ParseOptions) -> Result<ParsedRecords> {
    let intervals = document
        .get("intervals")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut builder = RecordsBuilder::new(*options);

    for (interval_index, interval) in intervals.iter().enumerate() {
        let streams = match interval_streams(interval) {
            Ok(streams) => streams,
            Err(reason) => {
                let entry = EntryRef {
                    direction: None,
                    index: builder.claim_unclassified(),
                    interval: interval_index,
                };
                builder.reject(entry, reason)?;
                continue;
            }
        };

        let mut grouped: [Vec<IntervalSample>; 2] = [Vec::new(), Vec::new()];

        for stream in streams {
            let direction = match classify(stream) {
                Ok(direction) => direction,
                Err(reason) => {
                    let entry = EntryRef {
                        direction: None,
                        index: builder.claim_unclassified(),
                        interval: interval_index,
                    };
                    builder.reject(entry, reason)?;
                    continue;
                }
            };

            let entry = EntryRef {
                direction: Some(direction),
                index: builder.claim(direction),
                interval: interval_index,
            };

            match sample_from_stream(stream) {
                Ok(sample) => {
                    builder.keep(direction);
                    grouped[direction.slot()].push(sample);
                }
                Err(reason) => builder.reject(entry, reason)?,
            }
        }

        for direction in Direction::ALL {
            if let Some(sample) = IntervalSample::combine(&grouped[direction.slot()]) {
                builder.push(direction, sample);
            }
        }
    }

    Ok(builder.finish())
}

fn interval_streams(interval: &Value) -> Result<&[Value], MalformedReason> {
    let interval = interval.as_object().ok_or(MalformedReason::NotAnObject)?;
    interval
        .get("streams")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or(MalformedReason::MissingStreams)
}

fn classify(stream: &Value) -> Result<Direction, MalformedReason> {
    let stream = stream.as_object().ok_or(MalformedReason::NotAnObject)?;
    match stream.get("sender") {
        None | Some(Value::Null) => Err(MalformedReason::MissingField("sender")),
        Some(Value::Bool(flag)) => Ok(Direction::from_sender_flag(*flag)),
        Some(_) => Err(MalformedReason::WrongType {
            field: "sender",
            expected: "a boolean",
        }),
    }
}

fn sample_from_stream(stream: &Value) -> Result<IntervalSample, MalformedReason> {
    let stream = stream.as_object().ok_or(MalformedReason::NotAnObject)?;

    let start = required(stream, "start", as_number)?;
    let end = required(stream, "end", as_number)?;
    if end <= start {
        return Err(MalformedReason::InvalidBounds { start, end });
    }

    let bytes = required(stream, "bytes", as_count)?;
    let bits_per_second = optional(stream, "bits_per_second", as_non_negative)?;
    let packets = optional(stream, "packets", as_count)?;
    let lost_packets = optional(stream, "lost_packets", as_count)?;
    let jitter_ms = optional(stream, "jitter_ms", as_non_negative)?;

    if let (Some(sent), Some(lost)) = (packets, lost_packets) {
        if lost > sent {
            return Err(MalformedReason::LossExceedsSent { lost, sent });
        }
    }

    Ok(IntervalSample {
        start,
        end,
        bytes,
        bits_per_second,
        packets,
        lost_packets,
        jitter_ms,
    })
}

/// Field extractor: returns the typed value or the expected type's name.
type Extract<T> = fn(&Value) -> Result<T, &'static str>;

fn required<T>(
    object: &Map<String, Value>,
    field: &'static str,
    extract: Extract<T>,
) -> Result<T, MalformedReason> {
    optional(object, field, extract)?.ok_or(MalformedReason::MissingField(field))
}

/// `null` counts as absent.
fn optional<T>(
    object: &Map<String, Value>,
    field: &'static str,
    extract: Extract<T>,
) -> Result<Option<T>, MalformedReason> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => extract(value)
            .map(Some)
            .map_err(|expected| MalformedReason::WrongType { field, expected }),
    }
}

fn as_number(value: &Value) -> Result<f64, &'static str> {
    value.as_f64().filter(|v| v.is_finite()).ok_or("a number")
}

fn as_non_negative(value: &Value) -> Result<f64, &'static str> {
    value
        .as_f64()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or("a non-negative number")
}

fn as_count(value: &Value) -> Result<u64, &'static str> {
    value.as_u64().ok_or("a non-negative integer")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stream(sender: bool, start: f64, end: f64, bytes: u64) -> Value {
        json!({
            "socket": 5,
            "start": start,
            "end": end,
            "seconds": end - start,
            "bytes": bytes,
            "bits_per_second": bytes as f64 * 8.0 / (end - start),
            "packets": 100,
            "lost_packets": 2,
            "jitter_ms": 0.25,
            "sender": sender
        })
    }

    fn report(intervals: Vec<Value>) -> Value {
        json!({ "intervals": intervals })
    }

    fn interval(streams: Vec<Value>) -> Value {
        json!({ "streams": streams })
    }

    fn bidir(count: usize) -> Value {
        let intervals = (0..count)
            .map(|i| {
                let start = i as f64;
                interval(vec![
                    stream(true, start, start + 1.0, 1000),
                    stream(false, start, start + 1.0, 900),
                ])
            })
            .collect();
        report(intervals)
    }

    #[test]
    fn parses_both_directions() {
        let records = parse_records(&bidir(3), &ParseOptions::default()).unwrap();

        assert_eq!(records.sender.len(), 3);
        assert_eq!(records.receiver.len(), 3);
        assert!(records.skipped.is_empty());
        assert_eq!(records.total(), 6);
        assert_eq!(records.kept(), 6);

        let first = &records.receiver.samples[0];
        assert_eq!(first.bytes, 900);
        assert_eq!(first.packets, Some(100));
        assert_eq!(first.lost_packets, Some(2));
        assert_eq!(first.jitter_ms, Some(0.25));
    }

    #[test]
    fn missing_intervals_yields_empty_series() {
        let records = parse_records(&json!({}), &ParseOptions::default()).unwrap();
        assert!(records.sender.is_empty());
        assert!(records.receiver.is_empty());
        assert_eq!(records.total(), 0);
    }

    #[test]
    fn skips_entry_missing_required_field() {
        let mut doc = bidir(4);
        doc["intervals"][2]["streams"][1]
            .as_object_mut()
            .unwrap()
            .remove("bytes");

        let records = parse_records(&doc, &ParseOptions::default()).unwrap();

        assert_eq!(records.receiver.len(), 3);
        assert_eq!(records.sender.len(), 4);
        assert_eq!(records.skipped.len(), 1);

        let skipped = &records.skipped[0];
        assert_eq!(skipped.entry.direction, Some(Direction::Receiver));
        assert_eq!(skipped.entry.index, 2);
        assert_eq!(skipped.entry.interval, 2);
        assert_eq!(skipped.reason, MalformedReason::MissingField("bytes"));

        let tally = records.tally(Direction::Receiver);
        assert_eq!(tally.total, 4);
        assert_eq!(tally.kept, 3);
        assert_eq!(tally.skipped(), 1);
    }

    #[test]
    fn skipping_preserves_order_of_kept_entries() {
        let mut doc = bidir(5);
        doc["intervals"][1]["streams"][0]["end"] = json!("soon");
        doc["intervals"][3]["streams"][0]["start"] = json!(null);

        let records = parse_records(&doc, &ParseOptions::default()).unwrap();

        let starts: Vec<f64> = records.sender.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0.0, 2.0, 4.0]);
        assert_eq!(records.kept() + records.skipped.len(), records.total());
    }

    #[test]
    fn strict_mode_fails_with_location() {
        let mut doc = bidir(2);
        doc["intervals"][1]["streams"][0]["bytes"] = json!(-5);

        let options = ParseOptions {
            skip_malformed: false,
        };
        let err = parse_records(&doc, &options).unwrap_err();

        match err {
            Error::MalformedInput { entry, reason } => {
                assert_eq!(entry.direction, Some(Direction::Sender));
                assert_eq!(entry.index, 1);
                assert_eq!(entry.interval, 1);
                assert_eq!(
                    reason,
                    MalformedReason::WrongType {
                        field: "bytes",
                        expected: "a non-negative integer",
                    }
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_inverted_bounds() {
        let doc = report(vec![interval(vec![stream(true, 2.0, 1.0, 10)])]);
        let records = parse_records(&doc, &ParseOptions::default()).unwrap();

        assert!(records.sender.is_empty());
        assert!(matches!(
            records.skipped[0].reason,
            MalformedReason::InvalidBounds { .. }
        ));
    }

    #[test]
    fn rejects_more_lost_than_sent() {
        let mut s = stream(false, 0.0, 1.0, 10);
        s["lost_packets"] = json!(101);
        let doc = report(vec![interval(vec![s])]);

        let records = parse_records(&doc, &ParseOptions::default()).unwrap();
        assert_eq!(
            records.skipped[0].reason,
            MalformedReason::LossExceedsSent {
                lost: 101,
                sent: 100
            }
        );
    }

    #[test]
    fn unclassified_entries_are_counted() {
        let mut no_flag = stream(true, 0.0, 1.0, 10);
        no_flag.as_object_mut().unwrap().remove("sender");
        let doc = report(vec![
            interval(vec![no_flag, json!(42)]),
            json!("not an interval"),
        ]);

        let records = parse_records(&doc, &ParseOptions::default()).unwrap();

        assert_eq!(records.unclassified, 3);
        assert_eq!(records.total(), 3);
        assert_eq!(records.kept(), 0);
        assert!(records.skipped.iter().all(|s| s.entry.direction.is_none()));
        assert_eq!(records.skipped[2].reason, MalformedReason::NotAnObject);
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let doc = report(vec![interval(vec![json!({
            "start": 0.0, "end": 1.0, "bytes": 125000, "sender": true
        })])]);

        let records = parse_records(&doc, &ParseOptions::default()).unwrap();
        let sample = &records.sender.samples[0];
        assert_eq!(sample.bits_per_second, None);
        assert_eq!(sample.packets, None);
        assert_eq!(sample.jitter_ms, None);
    }

    #[test]
    fn parallel_streams_are_combined() {
        let mut a = stream(false, 0.0, 1.0, 1000);
        a["jitter_ms"] = json!(0.2);
        let mut b = stream(false, 0.0, 1.0, 500);
        b["jitter_ms"] = json!(0.4);
        let doc = report(vec![interval(vec![a, b])]);

        let records = parse_records(&doc, &ParseOptions::default()).unwrap();

        assert_eq!(records.receiver.len(), 1);
        assert_eq!(records.tally(Direction::Receiver).kept, 2);
        let sample = &records.receiver.samples[0];
        assert_eq!(sample.bytes, 1500);
        assert_eq!(sample.packets, Some(200));
        assert_eq!(sample.lost_packets, Some(4));
        assert!((sample.jitter_ms.unwrap() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn gaps_counts_discontinuities() {
        let sample = |start: f64, end: f64| IntervalSample {
            start,
            end,
            bytes: 0,
            bits_per_second: None,
            packets: None,
            lost_packets: None,
            jitter_ms: None,
        };
        let series = DirectionSeries::from_samples(
            Direction::Sender,
            vec![sample(0.0, 1.0), sample(1.000004, 2.0), sample(3.0, 4.0)],
        );
        assert_eq!(series.gaps(0.01), 1);
    }
}
