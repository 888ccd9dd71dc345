//! Text decoration around rendered plots.
//!
//! Applied to backend output: an optional vertical y label down the left
//! edge, axis information below the plot, and header lines with the
//! generation time and test metadata.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::source::TestMetadata;

/// Placeholder for absent metadata fields.
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YLabelPosition {
    #[default]
    Left,
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YLabelRotation {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecorateOptions {
    pub inline_ylabel: bool,
    pub ylabel_position: YLabelPosition,
    pub ylabel_rotation: YLabelRotation,
    pub axis_info_below: bool,
    pub timestamp: bool,
    pub metadata: bool,
}

impl Default for DecorateOptions {
    fn default() -> Self {
        Self {
            inline_ylabel: true,
            ylabel_position: YLabelPosition::Left,
            ylabel_rotation: YLabelRotation::Vertical,
            axis_info_below: false,
            timestamp: true,
            metadata: true,
        }
    }
}

impl DecorateOptions {
    /// Whether the y label is written vertically beside the plot.
    pub fn vertical_ylabel(&self) -> bool {
        self.inline_ylabel
            && self.ylabel_position == YLabelPosition::Left
            && self.ylabel_rotation == YLabelRotation::Vertical
    }

    /// The y label a backend should draw itself, if any.
    pub fn backend_ylabel<'a>(&self, label: &'a str) -> Option<&'a str> {
        (!self.vertical_ylabel()).then_some(label)
    }
}

/// Axis labels of one plot.
#[derive(Debug, Clone, Copy)]
pub struct AxisLabels<'a> {
    pub x: &'a str,
    pub y: &'a str,
}

/// Apply every enabled decoration to a rendered plot.
pub fn decorate(
    plot: &str,
    labels: AxisLabels<'_>,
    metadata: &TestMetadata,
    generated: DateTime<Local>,
    options: &DecorateOptions,
) -> String {
    let mut body = plot.to_string();
    if options.vertical_ylabel() {
        body = vertical_ylabel(&body, labels.y);
    }
    if options.axis_info_below {
        body = axis_info_below(&body, labels);
    }

    let header = header_lines(
        options.timestamp.then_some(generated),
        options.metadata.then_some(metadata),
    );
    if header.is_empty() {
        return body;
    }
    format!("{}\n\n{body}", header.join("\n"))
}

/// Write `label` one character per row, centred on the rows that contain
/// the plot's `|` axis. Other rows are indented to keep columns aligned.
///
/// Spaces become underscores so the label stays readable.
pub fn vertical_ylabel(plot: &str, label: &str) -> String {
    let rows: Vec<&str> = plot.lines().collect();
    let chars: Vec<char> = label
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();

    let first = rows.iter().position(|r| r.contains('|'));
    let last = rows.iter().rposition(|r| r.contains('|'));
    let (Some(first), Some(last)) = (first, last) else {
        return plot.to_string();
    };
    let middle = first + (last - first) / 2;
    let start = middle.saturating_sub(chars.len() / 2);

    rows.iter()
        .enumerate()
        .map(|(i, row)| match i.checked_sub(start).and_then(|k| chars.get(k)) {
            Some(c) => format!("{c} {row}"),
            None => format!("  {row}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop trailing blank rows and append `X Axis:` / `Y Axis:` lines.
pub fn axis_info_below(plot: &str, labels: AxisLabels<'_>) -> String {
    let mut rows: Vec<&str> = plot.lines().collect();
    while rows.last().is_some_and(|r| r.trim().is_empty()) {
        rows.pop();
    }
    let x = format!("X Axis: {}", labels.x);
    let y = format!("Y Axis: {}", labels.y);
    rows.push("");
    rows.push(&x);
    rows.push(&y);
    rows.join("\n")
}

/// Header lines for the generation time and test metadata.
pub fn header_lines(
    generated: Option<DateTime<Local>>,
    metadata: Option<&TestMetadata>,
) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(time) = generated {
        lines.push(format!("Generated: {}", time.to_rfc3339()));
    }
    if let Some(meta) = metadata {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        lines.push(format!("Time: {}", field(&meta.time)));
        lines.push(format!("Protocol: {}", field(&meta.protocol)));
        lines.push(format!("Local Host: {}", field(&meta.local_host)));
        lines.push(format!("Remote Host: {}", field(&meta.remote_host)));
        if let Some(streams) = meta.num_streams {
            lines.push(format!("Streams: {streams}"));
        }
        if let Some(duration) = meta.duration {
            lines.push(format!("Duration: {duration} s"));
        }
    }
    lines
}
