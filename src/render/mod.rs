//! Plot rendering.
//!
//! A [`RenderRequest`] describes one plot independent of how it is drawn.
//! A [`RenderBackend`] turns it into ASCII text, and [`decorate`] adds
//! labels and headers around the result.
//!
//! ## Submodules
//!
//! - [`request`]: Request building, validation and tick formatting
//! - [`chart`]: Built-in ratatui backend
//! - [`gnuplot`]: External gnuplot backend
//! - [`decorate`]: Vertical y label, axis info and header lines

pub mod chart;
pub mod decorate;
pub mod gnuplot;
pub mod request;

pub use chart::ChartBackend;
pub use decorate::{
    decorate, AxisLabels, DecorateOptions, YLabelPosition, YLabelRotation,
};
pub use gnuplot::GnuplotBackend;
pub use request::{
    build_render_request, LegendPosition, PlotLine, PlotStyle, RenderOptions, RenderRequest,
    MAX_DIMENSION, TIME_LABEL,
};

use std::fmt::Debug;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Turns render requests into ASCII text.
pub trait RenderBackend: Debug {
    /// Short backend name for diagnostics.
    fn name(&self) -> &str;

    /// Draw one plot.
    fn render(&self, request: &RenderRequest) -> Result<String, RenderError>;
}

/// Available render backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process ratatui chart.
    #[default]
    Builtin,
    /// External `gnuplot` executable.
    Gnuplot,
}

impl BackendKind {
    pub fn create(&self) -> Box<dyn RenderBackend> {
        match self {
            BackendKind::Builtin => Box::new(ChartBackend::new()),
            BackendKind::Gnuplot => Box::new(GnuplotBackend::new()),
        }
    }
}
