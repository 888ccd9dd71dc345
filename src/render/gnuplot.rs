//! External backend: pipes a generated script through `gnuplot`.

use std::fmt::Write as _;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use super::request::{PlotStyle, RenderRequest};
use super::RenderBackend;
use crate::error::RenderError;

/// Renders plots with a gnuplot text terminal.
#[derive(Debug, Clone)]
pub struct GnuplotBackend {
    program: PathBuf,
}

impl Default for GnuplotBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GnuplotBackend {
    /// Use `gnuplot` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("gnuplot")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl RenderBackend for GnuplotBackend {
    fn name(&self) -> &str {
        "gnuplot"
    }

    fn render(&self, request: &RenderRequest) -> Result<String, RenderError> {
        if request.lines.is_empty() {
            return Err(RenderError::Degenerate("no lines to draw".to_string()));
        }
        let script = script(request);
        debug!(program = %self.program.display(), bytes = script.len(), "Running gnuplot");

        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(RenderError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            // A renderer that exits early closes the pipe; its status tells why.
            if let Err(err) = stdin.write_all(script.as_bytes()) {
                if err.kind() != ErrorKind::BrokenPipe {
                    return Err(err.into());
                }
            }
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Generate the gnuplot script for a request.
pub fn script(request: &RenderRequest) -> String {
    let mut s = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(
        s,
        "set terminal {} size {},{}",
        request.terminal, request.width, request.height
    );
    let _ = writeln!(s, "set title \"{}\"", quote(&request.title));
    let _ = writeln!(s, "set xlabel \"{}\"", quote(&request.x_label));
    if let Some(label) = &request.y_label {
        let _ = writeln!(s, "set ylabel \"{}\"", quote(label));
    }
    if request.compact_ylabel {
        s.push_str("set format y \"%.2g\"\n");
    }
    if request.grid {
        s.push_str("set grid\n");
    }
    match request.legend {
        Some(position) => {
            let _ = writeln!(s, "set key {}", position.key_position());
        }
        None => s.push_str("unset key\n"),
    }
    let _ = writeln!(
        s,
        "set xrange [{}:{}]",
        request.x_range.min, request.x_range.max
    );
    let _ = writeln!(
        s,
        "set yrange [{}:{}]",
        request.y_range.min, request.y_range.max
    );

    for (i, line) in request.lines.iter().enumerate() {
        let _ = writeln!(s, "$line{i} << EOD");
        for (x, y) in &line.points {
            let _ = writeln!(s, "{x} {y}");
        }
        s.push_str("EOD\n");
    }

    let clauses: Vec<String> = request
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let point = match request.style {
                PlotStyle::Lines => String::new(),
                PlotStyle::Points => format!(" pt \"{}\"", line.glyph),
                PlotStyle::LinesPoints => format!(" pt \"{}\"", request.point_glyph),
            };
            format!(
                "$line{i} using 1:2 with {}{point} title \"{}\"",
                request.style.keyword(),
                quote(&format!("{} {}", line.glyph, line.label))
            )
        })
        .collect();
    let _ = writeln!(s, "plot {}", clauses.join(", "));
    s
}

fn quote(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
