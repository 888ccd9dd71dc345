use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::json;

use iperf_plot::data::{
    build_series, derive_metrics, parse_records, reconcile, DeriveOptions, MetricSelection,
    ParseOptions, SeriesOptions,
};
use iperf_plot::source::parse_report;
use iperf_plot::{output, App, Direction, Error, Metric, Reading, Settings};

fn sample_report() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data/data.json")
}

fn settings() -> Settings {
    Settings {
        include_timestamp: false,
        ..Settings::default()
    }
}

#[test]
fn sample_report_renders_with_builtin_backend() {
    let app = App::new(settings());

    let run = app.run(&sample_report()).unwrap();

    // Sender entries carry no loss or jitter, so those plots are skipped.
    let stems: Vec<&str> = run.plots.iter().map(|p| p.stem.as_str()).collect();
    assert_eq!(
        stems,
        vec![
            "senderBytes_data",
            "receiverBytes_data",
            "receiverPacketLoss_data",
            "receiverJitter_data",
        ]
    );
    assert_eq!(
        run.diagnostics.empty_plots,
        vec!["senderPacketLoss_data", "senderJitter_data"]
    );
    assert_eq!(run.diagnostics.sender.kept, 10);
    assert_eq!(run.diagnostics.receiver.kept, 10);

    for plot in &run.plots {
        assert!(plot.text.is_ascii());
        assert!(plot.text.contains("Protocol: UDP"));
        assert!(plot.text.contains("Local Host: 192.168.1.20"));
        assert!(plot.text.contains("Streams: 1"));
        assert!(plot.text.contains("Duration: 10 s"));
        assert!(plot.text.contains('|'));
    }
    assert!(run.series.iter().all(|s| s.len() == 10));
}

#[test]
fn plots_and_export_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let app = App::new(settings());
    let run = app.run(&sample_report()).unwrap();

    let paths = output::write_plots(dir.path(), &run.plots).unwrap();
    let export = output::export_series(dir.path(), &run).unwrap();

    assert_eq!(paths.len(), 4);
    assert!(dir.path().join("receiverJitter_data.txt").is_file());
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(export).unwrap()).unwrap();
    assert_eq!(json["series"].as_array().unwrap().len(), 6);
}

#[test]
fn two_by_two_round_trip() {
    let report = json!({ "intervals": [
        { "streams": [
            { "start": 0, "end": 1, "bytes": 100, "packets": 10, "lost_packets": 0, "jitter_ms": 0.1, "sender": true },
            { "start": 0, "end": 1, "bytes": 90, "packets": 10, "lost_packets": 1, "jitter_ms": 0.2, "sender": false }
        ] },
        { "streams": [
            { "start": 1, "end": 2, "bytes": 200, "packets": 20, "lost_packets": 0, "jitter_ms": 0.3, "sender": true },
            { "start": 1, "end": 2, "bytes": 180, "packets": 20, "lost_packets": 5, "jitter_ms": 0.4, "sender": false }
        ] }
    ] });

    let records = parse_records(&report, &ParseOptions::default()).unwrap();
    let points = reconcile(&records.sender, &records.receiver, 0.01);
    let derived = derive_metrics(&points, &MetricSelection::all(), &DeriveOptions::default());
    let series = build_series(
        &derived,
        &SeriesOptions {
            consistent_throughput_yaxis: true,
        },
    )
    .unwrap();

    let find = |metric, direction| {
        series
            .iter()
            .find(|s| s.metric == metric && s.direction == direction)
            .unwrap()
    };
    let values = |metric, direction| -> Vec<Reading> {
        find(metric, direction).points.iter().map(|p| p.reading).collect()
    };

    assert_eq!(points.len(), 2);
    assert_eq!(
        values(Metric::Bytes, Direction::Sender),
        vec![Reading::Value(100.0), Reading::Value(200.0)]
    );
    assert_eq!(
        values(Metric::PacketLoss, Direction::Receiver),
        vec![Reading::Value(10.0), Reading::Value(25.0)]
    );
    assert_eq!(
        values(Metric::Jitter, Direction::Receiver),
        vec![Reading::Value(0.2), Reading::Value(0.4)]
    );
    assert_eq!(
        find(Metric::Bytes, Direction::Sender).range,
        find(Metric::Bytes, Direction::Receiver).range
    );
}

#[test]
fn empty_report_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("graphs_ascii");
    let report = parse_report(r#"{"intervals": []}"#, "empty").unwrap();
    let app = App::new(settings());

    let result = app.process(&report, Local::now());

    assert!(matches!(result, Err(Error::EmptySeries { .. })));
    assert!(!out_dir.exists());
}

#[test]
fn one_malformed_entry_is_skipped() {
    let mut intervals: Vec<serde_json::Value> = (0..5)
        .map(|i| json!({ "streams": [
            { "start": i, "end": i + 1, "bytes": 1000, "sender": true }
        ] }))
        .collect();
    intervals[2]["streams"][0]["bytes"] = json!("lots");
    let report = json!({ "intervals": intervals });

    let records = parse_records(&report, &ParseOptions::default()).unwrap();

    assert_eq!(records.tally(Direction::Sender).total, 5);
    assert_eq!(records.tally(Direction::Sender).kept, 4);
    assert_eq!(records.skipped.len(), 1);
    assert_eq!(records.skipped[0].entry.index, 2);

    let strict = ParseOptions {
        skip_malformed: false,
    };
    assert!(matches!(
        parse_records(&report, &strict),
        Err(Error::MalformedInput { .. })
    ));
}
