//! Application pipeline: one report in, rendered plots out.

use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::data::{
    build_series, derive_metrics, parse_records, reconcile, Direction, EntryTally, Metric,
    MetricSeries, SkippedEntry,
};
use crate::error::Result;
use crate::render::{build_render_request, decorate, AxisLabels, RenderBackend, TIME_LABEL};
use crate::source::{load_report, Report};

/// One rendered plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plot {
    /// Output file stem, e.g. `senderBytes_data`.
    pub stem: String,
    pub title: String,
    /// Decorated ASCII text.
    pub text: String,
}

/// What happened to the input while processing a report.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub sender: EntryTally,
    pub receiver: EntryTally,
    pub unclassified: usize,
    pub skipped: Vec<SkippedEntry>,
    /// Discontinuities between consecutive intervals, per direction.
    pub sender_gaps: usize,
    pub receiver_gaps: usize,
    /// Stems of plots left out because they had no values.
    pub empty_plots: Vec<String>,
}

/// Result of processing one report.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Input file stem.
    pub name: String,
    pub plots: Vec<Plot>,
    pub series: Vec<MetricSeries>,
    pub diagnostics: Diagnostics,
}

/// Plots to draw: stem, title, metric, and member series.
struct PlotGroup<'a> {
    stem: String,
    title: String,
    metric: Metric,
    members: Vec<&'a MetricSeries>,
}

/// Turns reports into plots with fixed settings and backend.
#[derive(Debug)]
pub struct App {
    settings: Settings,
    backend: Box<dyn RenderBackend>,
}

impl App {
    /// Create an app using the backend named in the settings.
    pub fn new(settings: Settings) -> Self {
        let backend = settings.render_backend.create();
        Self::with_backend(settings, backend)
    }

    pub fn with_backend(settings: Settings, backend: Box<dyn RenderBackend>) -> Self {
        Self { settings, backend }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Load and process one report file. Nothing is written.
    pub fn run(&self, path: &Path) -> anyhow::Result<RunOutput> {
        let report = load_report(path)?;
        info!("Processing {}", path.display());
        Ok(self.process(&report, Local::now())?)
    }

    /// Run the pipeline on a decoded report.
    pub fn process(&self, report: &Report, generated: DateTime<Local>) -> Result<RunOutput> {
        let settings = &self.settings;
        let records = parse_records(&report.document, &settings.parse_options())?;

        for skipped in &records.skipped {
            warn!("Skipping malformed entry {}: {}", skipped.entry, skipped.reason);
        }
        info!(
            "Parsed {} of {} entries ({} sender, {} receiver)",
            records.kept(),
            records.total(),
            records.sender.len(),
            records.receiver.len()
        );

        let tolerance = settings.time_tolerance_secs;
        let mut diagnostics = Diagnostics {
            sender: records.tally(Direction::Sender),
            receiver: records.tally(Direction::Receiver),
            unclassified: records.unclassified,
            skipped: records.skipped.clone(),
            sender_gaps: records.sender.gaps(tolerance),
            receiver_gaps: records.receiver.gaps(tolerance),
            empty_plots: Vec::new(),
        };
        debug!(
            sender = diagnostics.sender_gaps,
            receiver = diagnostics.receiver_gaps,
            "Interval gaps"
        );

        let points = reconcile(&records.sender, &records.receiver, tolerance);
        let selection = settings.metric_selection();
        if selection.is_empty() {
            warn!("No metrics enabled; nothing to plot");
        }
        let derived = derive_metrics(&points, &selection, &settings.derive_options());
        let series = build_series(&derived, &settings.series_options())?;

        let render_options = settings.render_options();
        let decorate_options = settings.decorate_options();
        let mut plots = Vec::new();

        for group in self.layout(&report.name, &series) {
            let (present, empty): (Vec<&MetricSeries>, Vec<&MetricSeries>) =
                group.members.into_iter().partition(|s| s.has_values());
            for s in &empty {
                warn!("No data available for {}", s.name);
            }
            if present.is_empty() {
                diagnostics.empty_plots.push(group.stem);
                continue;
            }

            info!("Generating {}", group.stem);
            let y_label = group.metric.y_label();
            let request = build_render_request(
                &group.title,
                decorate_options.backend_ylabel(y_label),
                &present,
                &render_options,
            )?;
            let raw = self.backend.render(&request)?;
            let text = decorate(
                &raw,
                AxisLabels {
                    x: TIME_LABEL,
                    y: y_label,
                },
                &report.metadata,
                generated,
                &decorate_options,
            );
            plots.push(Plot {
                stem: group.stem,
                title: group.title,
                text,
            });
        }

        Ok(RunOutput {
            name: report.name.clone(),
            plots,
            series,
            diagnostics,
        })
    }

    /// Group series into plots: one per series, or one per metric when
    /// directions are combined.
    fn layout<'a>(&self, name: &str, series: &'a [MetricSeries]) -> Vec<PlotGroup<'a>> {
        if !self.settings.combine_directions {
            return series
                .iter()
                .map(|s| PlotGroup {
                    stem: format!("{}{}_{name}", s.direction.label(), s.metric.suffix()),
                    title: s.metric.title(Some(s.direction)),
                    metric: s.metric,
                    members: vec![s],
                })
                .collect();
        }

        let mut groups: Vec<PlotGroup<'a>> = Vec::new();
        for s in series {
            match groups.iter_mut().find(|g| g.metric == s.metric) {
                Some(group) => group.members.push(s),
                None => groups.push(PlotGroup {
                    stem: format!("{}_{name}", s.metric.key()),
                    title: s.metric.title(None),
                    metric: s.metric,
                    members: vec![s],
                }),
            }
        }
        groups
    }
}
