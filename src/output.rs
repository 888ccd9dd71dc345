//! Writing plots and series exports to disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use tracing::warn;

use crate::app::{Plot, RunOutput};
use crate::data::{EntryTally, MetricSeries};

/// Write each plot to `<dir>/<stem>.txt`, creating `dir` if needed.
///
/// Plots are staged as `<stem>.txt.tmp` and only renamed into place once
/// every one of them was written, so a failed write leaves no partial set
/// behind. Returns the written paths in plot order.
pub fn write_plots(dir: &Path, plots: &[Plot]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(plots.len());
    for plot in plots {
        let path = dir.join(format!("{}.txt", plot.stem));
        let tmp = dir.join(format!("{}.txt.tmp", plot.stem));
        let mut text = plot.text.clone();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        if let Err(e) = fs::write(&tmp, text) {
            discard(staged.iter().map(|(tmp, _)| tmp));
            return Err(e).with_context(|| format!("failed to write {}", path.display()));
        }
        staged.push((tmp, path));
    }

    for (i, (tmp, path)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(tmp, path) {
            discard(staged[i..].iter().map(|(tmp, _)| tmp));
            return Err(e).with_context(|| format!("failed to write {}", path.display()));
        }
    }
    Ok(staged.into_iter().map(|(_, path)| path).collect())
}

fn discard<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            warn!("failed to remove {}: {e}", path.display());
        }
    }
}

#[derive(Serialize)]
struct SeriesExport<'a> {
    name: &'a str,
    generated: String,
    sender: EntryTally,
    receiver: EntryTally,
    skipped: usize,
    plots: Vec<&'a str>,
    series: &'a [MetricSeries],
}

/// Write the built series of a run as pretty JSON to
/// `<dir>/series_<name>.json`.
pub fn export_series(dir: &Path, output: &RunOutput) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let export = SeriesExport {
        name: &output.name,
        generated: Local::now().to_rfc3339(),
        sender: output.diagnostics.sender,
        receiver: output.diagnostics.receiver,
        skipped: output.diagnostics.skipped.len(),
        plots: output.plots.iter().map(|p| p.stem.as_str()).collect(),
        series: &output.series,
    };
    let json = serde_json::to_string_pretty(&export)?;

    let path = dir.join(format!("series_{}.json", output.name));
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Diagnostics;
    use crate::data::{AxisRange, Direction, Metric, Reading, SeriesPoint};

    fn plot(stem: &str) -> Plot {
        Plot {
            stem: stem.to_string(),
            title: "title".to_string(),
            text: " |*\n +--".to_string(),
        }
    }

    #[test]
    fn writes_one_file_per_plot() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("graphs_ascii");

        let paths = write_plots(&out_dir, &[plot("senderBytes_data"), plot("jitter_data")]).unwrap();

        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], out_dir.join("senderBytes_data.txt"));
        let text = fs::read_to_string(&paths[1]).unwrap();
        assert_eq!(text, " |*\n +--\n");
    }

    #[test]
    fn failed_write_leaves_no_partial_set() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the second staging file would go makes its write fail.
        fs::create_dir(dir.path().join("receiverJitter_data.txt.tmp")).unwrap();

        let result = write_plots(
            dir.path(),
            &[plot("senderBytes_data"), plot("receiverJitter_data")],
        );

        assert!(result.is_err());
        assert!(!dir.path().join("senderBytes_data.txt").exists());
        assert!(!dir.path().join("senderBytes_data.txt.tmp").exists());
        assert!(!dir.path().join("receiverJitter_data.txt").exists());
    }

    #[test]
    fn rewriting_replaces_previous_plots() {
        let dir = tempfile::tempdir().unwrap();
        write_plots(dir.path(), &[plot("senderBytes_data")]).unwrap();

        let mut updated = plot("senderBytes_data");
        updated.text = "new".to_string();
        let paths = write_plots(dir.path(), &[updated]).unwrap();

        assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "new\n");
        assert!(!dir.path().join("senderBytes_data.txt.tmp").exists());
    }

    #[test]
    fn no_plots_still_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("empty");

        assert!(write_plots(&out_dir, &[]).unwrap().is_empty());
        assert!(out_dir.is_dir());
    }

    #[test]
    fn export_contains_series_and_readings() {
        let dir = tempfile::tempdir().unwrap();
        let output = RunOutput {
            name: "data".to_string(),
            plots: vec![plot("receiverJitter_data")],
            series: vec![MetricSeries {
                metric: Metric::Jitter,
                direction: Direction::Receiver,
                name: "receiver jitter".to_string(),
                points: vec![
                    SeriesPoint {
                        time: 0.0,
                        reading: Reading::Value(0.5),
                    },
                    SeriesPoint {
                        time: 1.0,
                        reading: Reading::Gap,
                    },
                ],
                range: Some(AxisRange::new(0.5, 0.5)),
            }],
            diagnostics: Diagnostics::default(),
        };

        let path = export_series(dir.path(), &output).unwrap();

        assert_eq!(path, dir.path().join("series_data.json"));
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["name"], "data");
        assert_eq!(json["plots"][0], "receiverJitter_data");
        assert_eq!(json["series"][0]["metric"], "jitter");
        assert_eq!(json["series"][0]["direction"], "receiver");
        assert_eq!(json["series"][0]["points"][0]["reading"]["value"], 0.5);
        assert_eq!(json["series"][0]["points"][1]["reading"], "gap");
    }
}
