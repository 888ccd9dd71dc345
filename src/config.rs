//! Application settings.
//!
//! Settings come from an optional file (format chosen by extension, TOML
//! shipped) layered under `IPERF_PLOT_*` environment variables. Every key
//! has a default, so an empty or missing file yields a working setup.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::warn;

use crate::data::{
    DeriveOptions, Direction, Metric, MetricSelection, ParseOptions, SeriesOptions,
    DEFAULT_TIME_TOLERANCE_SECS,
};
use crate::render::{
    BackendKind, DecorateOptions, LegendPosition, PlotStyle, RenderOptions, YLabelPosition,
    YLabelRotation,
};

/// Environment variable prefix for overrides, e.g. `IPERF_PLOT_GRAPH_WIDTH`.
pub const ENV_PREFIX: &str = "IPERF_PLOT";

/// Largest supported rounding precision.
const MAX_PRECISION_DIGITS: u32 = 15;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_input_file: PathBuf,
    pub default_output_dir: PathBuf,

    // Layout
    pub graph_width: i64,
    pub graph_height: i64,
    pub precision_digits: u32,
    pub plot_char_primary: String,
    pub plot_char_secondary: String,
    pub plot_char_points: String,
    pub plot_style: PlotStyle,
    pub terminal_type: String,
    pub render_backend: BackendKind,
    pub enable_grid: bool,
    pub enable_legend: bool,
    pub legend_position: LegendPosition,

    // Y-axis label
    pub show_ylabel_inline: bool,
    pub ylabel_position: YLabelPosition,
    pub ylabel_rotation: YLabelRotation,
    pub compact_ylabel: bool,
    pub show_axis_info_below: bool,

    // Data handling
    pub skip_malformed_entries: bool,
    pub interpolate_missing_data: bool,
    pub time_tolerance_secs: f64,

    // Output
    pub include_timestamp: bool,
    pub include_metadata: bool,
    pub verbose_output: bool,

    // Metrics
    pub track_sender_bytes: bool,
    pub track_receiver_bytes: bool,
    pub track_packet_loss: bool,
    pub track_jitter: bool,
    pub track_bandwidth: bool,
    pub track_retransmissions: bool,
    pub consistent_throughput_yaxis: bool,
    pub combine_directions: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_input_file: PathBuf::from("data/data.json"),
            default_output_dir: PathBuf::from("graphs_ascii"),
            graph_width: 120,
            graph_height: 30,
            precision_digits: 6,
            plot_char_primary: "*".to_string(),
            plot_char_secondary: "A".to_string(),
            plot_char_points: "+".to_string(),
            plot_style: PlotStyle::LinesPoints,
            terminal_type: "dumb".to_string(),
            render_backend: BackendKind::Builtin,
            enable_grid: true,
            enable_legend: true,
            legend_position: LegendPosition::TopLeft,
            show_ylabel_inline: true,
            ylabel_position: YLabelPosition::Left,
            ylabel_rotation: YLabelRotation::Vertical,
            compact_ylabel: true,
            show_axis_info_below: false,
            skip_malformed_entries: true,
            interpolate_missing_data: false,
            time_tolerance_secs: DEFAULT_TIME_TOLERANCE_SECS,
            include_timestamp: true,
            include_metadata: true,
            verbose_output: true,
            track_sender_bytes: true,
            track_receiver_bytes: true,
            track_packet_loss: true,
            track_jitter: true,
            track_bandwidth: false,
            track_retransmissions: false,
            consistent_throughput_yaxis: true,
            combine_directions: false,
        }
    }
}

impl Settings {
    /// Load settings from `path` (if it exists) and the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("failed to read settings from {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("invalid settings in {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check values the type system does not constrain.
    ///
    /// Graph dimensions and glyphs are checked when a render request is
    /// built, so they fail per plot rather than at startup.
    pub fn validate(&self) -> Result<()> {
        if self.precision_digits > MAX_PRECISION_DIGITS {
            bail!(
                "precision_digits must be at most {MAX_PRECISION_DIGITS}, got {}",
                self.precision_digits
            );
        }
        if !self.time_tolerance_secs.is_finite() || self.time_tolerance_secs < 0.0 {
            bail!(
                "time_tolerance_secs must be a non-negative number, got {}",
                self.time_tolerance_secs
            );
        }
        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            skip_malformed: self.skip_malformed_entries,
        }
    }

    pub fn derive_options(&self) -> DeriveOptions {
        DeriveOptions {
            precision_digits: self.precision_digits,
            interpolate_missing: self.interpolate_missing_data,
        }
    }

    pub fn series_options(&self) -> SeriesOptions {
        SeriesOptions {
            consistent_throughput_yaxis: self.consistent_throughput_yaxis,
        }
    }

    /// The enabled (metric, direction) pairs.
    ///
    /// Bytes are tracked per direction; the other metrics cover both
    /// directions. Retransmissions do not exist for UDP tests and only
    /// produce a warning.
    pub fn metric_selection(&self) -> MetricSelection {
        if self.track_retransmissions {
            warn!("track_retransmissions is set but UDP reports carry no retransmits; ignoring");
        }

        let mut pairs = Vec::new();
        if self.track_sender_bytes {
            pairs.push((Metric::Bytes, Direction::Sender));
        }
        if self.track_receiver_bytes {
            pairs.push((Metric::Bytes, Direction::Receiver));
        }
        for (enabled, metric) in [
            (self.track_bandwidth, Metric::Throughput),
            (self.track_packet_loss, Metric::PacketLoss),
            (self.track_jitter, Metric::Jitter),
        ] {
            if enabled {
                pairs.extend(Direction::ALL.iter().map(|&d| (metric, d)));
            }
        }
        MetricSelection::new(pairs)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            width: self.graph_width,
            height: self.graph_height,
            primary_glyph: self.plot_char_primary.clone(),
            secondary_glyph: self.plot_char_secondary.clone(),
            point_glyph: self.plot_char_points.clone(),
            style: self.plot_style,
            grid: self.enable_grid,
            legend: self.enable_legend.then_some(self.legend_position),
            compact_ylabel: self.compact_ylabel,
            terminal: self.terminal_type.clone(),
            glyph_by_direction: self.combine_directions,
        }
    }

    pub fn decorate_options(&self) -> DecorateOptions {
        DecorateOptions {
            inline_ylabel: self.show_ylabel_inline,
            ylabel_position: self.ylabel_position,
            ylabel_rotation: self.ylabel_rotation,
            axis_info_below: self.show_axis_info_below,
            timestamp: self.include_timestamp,
            metadata: self.include_metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(extension: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/iperf-plot.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn toml_overrides_selected_keys() {
        let file = write_config(
            ".toml",
            r#"
graph_width = 80
plot_style = "points"
legend_position = "bottom right"
ylabel_rotation = "horizontal"
render_backend = "gnuplot"
track_bandwidth = true
"#,
        );

        let settings = Settings::load(file.path()).unwrap();

        assert_eq!(settings.graph_width, 80);
        assert_eq!(settings.graph_height, 30);
        assert_eq!(settings.plot_style, PlotStyle::Points);
        assert_eq!(settings.legend_position, LegendPosition::BottomRight);
        assert_eq!(settings.ylabel_rotation, YLabelRotation::Horizontal);
        assert_eq!(settings.render_backend, BackendKind::Gnuplot);
        assert!(settings.track_bandwidth);
    }

    #[test]
    fn flat_ini_file_is_accepted() {
        let file = write_config(".ini", "graph_height = 40\nenable_grid = false\n");

        let settings = Settings::load(file.path()).unwrap();

        assert_eq!(settings.graph_height, 40);
        assert!(!settings.enable_grid);
    }

    #[test]
    fn unknown_legend_position_is_rejected() {
        let file = write_config(".toml", "legend_position = \"middle\"\n");
        assert!(Settings::load(file.path()).is_err());
    }

    #[test]
    fn negative_tolerance_fails_validation() {
        let settings = Settings {
            time_tolerance_secs: -0.5,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn excessive_precision_fails_validation() {
        let settings = Settings {
            precision_digits: 40,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn default_selection_tracks_bytes_loss_and_jitter() {
        let selection = Settings::default().metric_selection();

        assert_eq!(selection.len(), 6);
        assert!(selection.contains(Metric::Bytes, Direction::Sender));
        assert!(selection.contains(Metric::Bytes, Direction::Receiver));
        assert!(selection.contains(Metric::PacketLoss, Direction::Receiver));
        assert!(selection.contains(Metric::Jitter, Direction::Sender));
        assert!(!selection.contains(Metric::Throughput, Direction::Sender));
    }

    #[test]
    fn bytes_are_tracked_per_direction() {
        let settings = Settings {
            track_sender_bytes: false,
            track_packet_loss: false,
            track_jitter: false,
            ..Settings::default()
        };

        let pairs: Vec<_> = settings.metric_selection().iter().collect();

        assert_eq!(pairs, vec![(Metric::Bytes, Direction::Receiver)]);
    }

    #[test]
    fn disabled_legend_maps_to_none() {
        let settings = Settings {
            enable_legend: false,
            ..Settings::default()
        };
        assert_eq!(settings.render_options().legend, None);
        assert_eq!(
            Settings::default().render_options().legend,
            Some(LegendPosition::TopLeft)
        );
    }
}
