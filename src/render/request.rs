//! Render requests: backend-neutral descriptions of one plot.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::{AxisRange, Direction, MetricSeries};
use crate::error::{Error, Result};

/// Largest accepted graph width or height, in characters.
pub const MAX_DIMENSION: i64 = 1000;

/// Largest accepted plot area, in character cells. The chart canvas indexes
/// its cells with `u16`.
pub const MAX_CELLS: u32 = u16::MAX as u32;

/// X-axis label shared by every plot.
pub const TIME_LABEL: &str = "Time (seconds)";

/// How data points are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotStyle {
    Lines,
    Points,
    #[default]
    LinesPoints,
}

impl PlotStyle {
    pub fn draws_lines(&self) -> bool {
        matches!(self, PlotStyle::Lines | PlotStyle::LinesPoints)
    }

    pub fn draws_points(&self) -> bool {
        matches!(self, PlotStyle::Points | PlotStyle::LinesPoints)
    }

    /// Gnuplot `with` keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            PlotStyle::Lines => "lines",
            PlotStyle::Points => "points",
            PlotStyle::LinesPoints => "linespoints",
        }
    }
}

/// Legend placement, written as `"<vertical> <horizontal>"` (e.g. `top left`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LegendPosition {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl LegendPosition {
    /// Gnuplot `set key` arguments.
    pub fn key_position(&self) -> &'static str {
        match self {
            LegendPosition::TopLeft => "top left",
            LegendPosition::TopRight => "top right",
            LegendPosition::BottomLeft => "bottom left",
            LegendPosition::BottomRight => "bottom right",
        }
    }
}

impl fmt::Display for LegendPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_position())
    }
}

impl FromStr for LegendPosition {
    type Err = String;

    /// Accepts the two words in either order, e.g. `left top`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let words: Vec<String> = s.split_whitespace().map(str::to_lowercase).collect();
        let has = |w: &str| words.iter().any(|x| x == w);
        if words.len() != 2 {
            return Err(format!("invalid legend position '{s}'"));
        }
        match (has("top"), has("bottom"), has("left"), has("right")) {
            (true, false, true, false) => Ok(LegendPosition::TopLeft),
            (true, false, false, true) => Ok(LegendPosition::TopRight),
            (false, true, true, false) => Ok(LegendPosition::BottomLeft),
            (false, true, false, true) => Ok(LegendPosition::BottomRight),
            _ => Err(format!("invalid legend position '{s}'")),
        }
    }
}

impl TryFrom<String> for LegendPosition {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LegendPosition> for String {
    fn from(position: LegendPosition) -> Self {
        position.key_position().to_string()
    }
}

/// Rendering settings shared by every plot of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub width: i64,
    pub height: i64,
    pub primary_glyph: String,
    pub secondary_glyph: String,
    pub point_glyph: String,
    pub style: PlotStyle,
    pub grid: bool,
    /// `None` hides the legend.
    pub legend: Option<LegendPosition>,
    pub compact_ylabel: bool,
    /// Gnuplot terminal name.
    pub terminal: String,
    /// Draw sender lines with the primary glyph and receiver lines with the
    /// secondary one, whatever their position in the plot.
    pub glyph_by_direction: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 120,
            height: 30,
            primary_glyph: "*".to_string(),
            secondary_glyph: "A".to_string(),
            point_glyph: "+".to_string(),
            style: PlotStyle::LinesPoints,
            grid: true,
            legend: Some(LegendPosition::TopLeft),
            compact_ylabel: true,
            terminal: "dumb".to_string(),
            glyph_by_direction: false,
        }
    }
}

/// One drawn line: present values only, in time order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotLine {
    pub label: String,
    pub glyph: char,
    pub points: Vec<(f64, f64)>,
}

/// Everything a backend needs to draw one plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRequest {
    pub title: String,
    pub x_label: String,
    /// Axis title handed to the backend; `None` when drawn by decoration.
    pub y_label: Option<String>,
    pub width: u16,
    pub height: u16,
    pub x_range: AxisRange,
    pub y_range: AxisRange,
    pub lines: Vec<PlotLine>,
    pub style: PlotStyle,
    pub point_glyph: char,
    pub grid: bool,
    pub legend: Option<LegendPosition>,
    pub compact_ylabel: bool,
    pub terminal: String,
}

/// Build a request for the given series, drawn in order.
///
/// The first series is drawn with the primary glyph and the second with the
/// secondary glyph, unless glyphs follow direction. Missing points are
/// omitted. The y range is the union of the series' ranges, widened when
/// flat.
pub fn build_render_request(
    title: &str,
    y_label: Option<&str>,
    series: &[&MetricSeries],
    options: &RenderOptions,
) -> Result<RenderRequest> {
    let width = dimension("graph_width", options.width)?;
    let height = dimension("graph_height", options.height)?;
    if exceeds_max_cells(width, height) {
        return Err(Error::InvalidRenderConfig(format!(
            "graph_width × graph_height must be at most {MAX_CELLS} cells, got {width}×{height}"
        )));
    }
    let primary = glyph("plot_char_primary", &options.primary_glyph)?;
    let secondary = glyph("plot_char_secondary", &options.secondary_glyph)?;
    let point_glyph = glyph("plot_char_points", &options.point_glyph)?;

    let glyphs = [primary, secondary];
    if series.is_empty() {
        return Err(Error::InvalidRenderConfig("no series to plot".to_string()));
    }
    if series.len() > glyphs.len() {
        return Err(Error::InvalidRenderConfig(format!(
            "at most {} series per plot, got {}",
            glyphs.len(),
            series.len()
        )));
    }
    if let Some(empty) = series.iter().find(|s| !s.has_values()) {
        return Err(Error::EmptySeries {
            metric: empty.metric,
            direction: empty.direction,
        });
    }

    if options.glyph_by_direction
        && series.len() == 2
        && series[0].direction == series[1].direction
    {
        return Err(Error::InvalidRenderConfig(format!(
            "two {} series cannot share a plot when glyphs follow direction",
            series[0].direction
        )));
    }

    let lines: Vec<PlotLine> = series
        .iter()
        .zip(glyphs)
        .map(|(s, positional)| PlotLine {
            label: s.name.clone(),
            glyph: if options.glyph_by_direction {
                match s.direction {
                    Direction::Sender => primary,
                    Direction::Receiver => secondary,
                }
            } else {
                positional
            },
            points: s.present_points().collect(),
        })
        .collect();

    let y_range = series
        .iter()
        .filter_map(|s| s.range)
        .reduce(AxisRange::union)
        .or_else(|| AxisRange::of(lines.iter().flat_map(|l| l.points.iter().map(|p| p.1))))
        .map(|r| r.padded())
        .ok_or_else(|| Error::EmptySeries {
            metric: series[0].metric,
            direction: series[0].direction,
        })?;
    let x_range = series
        .iter()
        .filter_map(|s| s.time_range())
        .reduce(AxisRange::union)
        .map(|r| r.padded())
        .ok_or_else(|| Error::EmptySeries {
            metric: series[0].metric,
            direction: series[0].direction,
        })?;

    Ok(RenderRequest {
        title: title.to_string(),
        x_label: TIME_LABEL.to_string(),
        y_label: y_label.map(str::to_string),
        width,
        height,
        x_range,
        y_range,
        lines,
        style: options.style,
        point_glyph,
        grid: options.grid,
        legend: options.legend,
        compact_ylabel: options.compact_ylabel,
        terminal: options.terminal.clone(),
    })
}

fn dimension(key: &str, value: i64) -> Result<u16> {
    if value <= 0 || value > MAX_DIMENSION {
        return Err(Error::InvalidRenderConfig(format!(
            "{key} must be between 1 and {MAX_DIMENSION}, got {value}"
        )));
    }
    // Bounded by MAX_DIMENSION above.
    Ok(value as u16)
}

pub(crate) fn exceeds_max_cells(width: u16, height: u16) -> bool {
    u32::from(width) * u32::from(height) > MAX_CELLS
}

fn glyph(key: &str, value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_graphic() => Ok(c),
        _ => Err(Error::InvalidRenderConfig(format!(
            "{key} must be a single printable ASCII character, got {value:?}"
        ))),
    }
}

/// Format an axis tick value.
///
/// Compact labels keep two significant digits and switch to exponent form
/// for large or tiny magnitudes.
pub fn format_tick(value: f64, compact: bool) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !compact {
        return trim_decimals(format!("{value:.2}"));
    }
    let magnitude = value.abs();
    if !(1e-2..1e4).contains(&magnitude) {
        let formatted = format!("{value:.1e}");
        return formatted.replace(".0e", "e");
    }
    let decimals = (1 - magnitude.log10().floor() as i32).max(0) as usize;
    trim_decimals(format!("{value:.decimals$}"))
}

fn trim_decimals(s: String) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Evenly spaced tick values from `range.min` to `range.max`.
pub fn ticks(range: AxisRange, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![range.min],
        n => (0..n)
            .map(|i| range.min + range.span() * i as f64 / (n - 1) as f64)
            .collect(),
    }
}
