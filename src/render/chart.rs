//! Built-in backend: draws a ratatui chart off-screen and flattens it to ASCII.
//!
//! ```text
//! RenderRequest ──▶ Chart (datasets, axes, legend)
//!                     │ Widget::render
//!                     ▼
//!                  Buffer (width × height cells)
//!                     │ flatten: marker colour → glyph, box drawing → ASCII
//!                     ▼
//!                  String
//! ```
//!
//! Every dataset is drawn with the dot marker in its own indexed colour, so
//! each marker cell in the buffer can be mapped back to the glyph of the line
//! that drew it.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Style},
    symbols::{self, Marker},
    text::Line,
    widgets::{self, Axis, Block, Chart, Dataset, GraphType, Widget},
};

use super::request::{
    exceeds_max_cells, format_tick, ticks, LegendPosition, RenderRequest, MAX_CELLS,
};
use super::RenderBackend;
use crate::data::AxisRange;
use crate::error::RenderError;

const GRID_GLYPH: char = '.';
const GRID_COLOR: Color = Color::Indexed(8);
const POINT_COLOR: Color = Color::Indexed(15);
const FIRST_LINE_COLOR: u8 = 16;

const X_TICKS: usize = 5;

/// Renders plots in-process with ratatui.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartBackend;

impl ChartBackend {
    pub fn new() -> Self {
        Self
    }
}

impl RenderBackend for ChartBackend {
    fn name(&self) -> &str {
        "builtin"
    }

    fn render(&self, request: &RenderRequest) -> Result<String, RenderError> {
        if request.lines.is_empty() {
            return Err(RenderError::Degenerate("no lines to draw".to_string()));
        }
        if exceeds_max_cells(request.width, request.height) {
            return Err(RenderError::Degenerate(format!(
                "{}×{} exceeds {MAX_CELLS} cells",
                request.width, request.height
            )));
        }

        let x_ticks = ticks(request.x_range, X_TICKS);
        let y_ticks = ticks(request.y_range, y_tick_count(request.height));

        // Datasets borrow their points, so grid segments must outlive the chart.
        let grid = if request.grid {
            grid_segments(request.x_range, request.y_range, &x_ticks, &y_ticks)
        } else {
            Vec::new()
        };

        let mut palette = vec![(GRID_COLOR, GRID_GLYPH), (POINT_COLOR, request.point_glyph)];
        let mut datasets: Vec<Dataset> = grid
            .iter()
            .map(|segment| {
                Dataset::default()
                    .marker(Marker::Dot)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(GRID_COLOR))
                    .data(segment)
            })
            .collect();

        for (i, line) in request.lines.iter().enumerate() {
            let color = Color::Indexed(FIRST_LINE_COLOR.saturating_add(i as u8));
            palette.push((color, line.glyph));
            let graph_type = if request.style.draws_lines() {
                GraphType::Line
            } else {
                GraphType::Scatter
            };
            datasets.push(
                Dataset::default()
                    .name(format!("{} {}", line.glyph, line.label))
                    .marker(Marker::Dot)
                    .graph_type(graph_type)
                    .style(Style::default().fg(color))
                    .data(&line.points),
            );
        }

        if request.style.draws_lines() && request.style.draws_points() {
            for line in &request.lines {
                datasets.push(
                    Dataset::default()
                        .marker(Marker::Dot)
                        .graph_type(GraphType::Scatter)
                        .style(Style::default().fg(POINT_COLOR))
                        .data(&line.points),
                );
            }
        }

        let mut y_axis = Axis::default()
            .bounds([request.y_range.min, request.y_range.max])
            .labels(
                y_ticks
                    .iter()
                    .map(|&v| format_tick(v, request.compact_ylabel))
                    .collect::<Vec<_>>(),
            );
        if let Some(label) = &request.y_label {
            y_axis = y_axis.title(label.as_str());
        }
        let x_axis = Axis::default()
            .title(request.x_label.as_str())
            .bounds([request.x_range.min, request.x_range.max])
            .labels(
                x_ticks
                    .iter()
                    .map(|&v| format_tick(v, false))
                    .collect::<Vec<_>>(),
            );

        let chart = Chart::new(datasets)
            .block(Block::new().title(Line::from(request.title.as_str()).centered()))
            .x_axis(x_axis)
            .y_axis(y_axis)
            .legend_position(request.legend.map(chart_legend_position))
            .hidden_legend_constraints((Constraint::Percentage(50), Constraint::Percentage(50)));

        let area = Rect::new(0, 0, request.width, request.height);
        let mut buffer = Buffer::empty(area);
        chart.render(area, &mut buffer);

        Ok(flatten(&buffer, &palette))
    }
}

fn y_tick_count(height: u16) -> usize {
    usize::from(height / 5).clamp(2, 6)
}

/// Horizontal segments at each y tick and vertical ones at each x tick,
/// skipping the ticks that coincide with the axes.
fn grid_segments(
    x: AxisRange,
    y: AxisRange,
    x_ticks: &[f64],
    y_ticks: &[f64],
) -> Vec<[(f64, f64); 2]> {
    let horizontal = y_ticks
        .iter()
        .skip(1)
        .map(|&v| [(x.min, v), (x.max, v)]);
    let vertical = x_ticks
        .iter()
        .skip(1)
        .map(|&v| [(v, y.min), (v, y.max)]);
    horizontal.chain(vertical).collect()
}

fn chart_legend_position(position: LegendPosition) -> widgets::LegendPosition {
    match position {
        LegendPosition::TopLeft => widgets::LegendPosition::TopLeft,
        LegendPosition::TopRight => widgets::LegendPosition::TopRight,
        LegendPosition::BottomLeft => widgets::LegendPosition::BottomLeft,
        LegendPosition::BottomRight => widgets::LegendPosition::BottomRight,
    }
}

/// Turn the buffer into ASCII rows with trailing blanks removed.
fn flatten(buffer: &Buffer, palette: &[(Color, char)]) -> String {
    let area = buffer.area;
    let mut rows = Vec::with_capacity(usize::from(area.height));
    for y in area.top()..area.bottom() {
        let row: String = (area.left()..area.right())
            .map(|x| {
                buffer
                    .cell((x, y))
                    .map_or(' ', |cell| cell_char(cell.symbol(), cell.fg, palette))
            })
            .collect();
        rows.push(row.trim_end().to_string());
    }
    rows.join("\n")
}

fn cell_char(symbol: &str, fg: Color, palette: &[(Color, char)]) -> char {
    if symbol == symbols::DOT {
        return palette
            .iter()
            .find(|(color, _)| *color == fg)
            .map_or('*', |(_, glyph)| *glyph);
    }
    let Some(c) = symbol.chars().next() else {
        return ' ';
    };
    match c {
        c if c.is_ascii_graphic() => c,
        '│' | '┃' | '║' | '┆' | '┊' => '|',
        '─' | '━' | '═' | '┄' | '┈' => '-',
        '┌' | '┐' | '└' | '┘' | '├' | '┤' | '┬' | '┴' | '┼' | '╭' | '╮' | '╰' | '╯' => '+',
        _ => ' ',
    }
}
