use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use iperf_plot::{output, App, BackendKind, RunOutput, Settings};

#[derive(Parser, Debug)]
#[command(name = "iperf-plot")]
#[command(about = "ASCII graphs from bidirectional iperf3 UDP reports")]
struct Args {
    /// iperf3 JSON reports (default: `default_input_file` from the config)
    inputs: Vec<PathBuf>,

    /// Path to the settings file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Output directory (default: `default_output_dir` from the config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Render backend, overriding the config
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Also write the built series as JSON next to the plots
    #[arg(long)]
    export: bool,

    /// Print plots to stdout instead of writing files
    #[arg(long)]
    stdout: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Process every input; returns whether all of them succeeded.
fn run(args: Args) -> Result<bool> {
    let mut settings = Settings::load(&args.config)?;
    if let Some(backend) = args.backend {
        settings.render_backend = backend;
    }
    init_logging(&settings, args.verbose)?;

    if !args.config.exists() {
        warn!(
            "Config file {} not found, using defaults",
            args.config.display()
        );
    }

    let inputs = if args.inputs.is_empty() {
        vec![settings.default_input_file.clone()]
    } else {
        args.inputs.clone()
    };
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| settings.default_output_dir.clone());

    let app = App::new(settings);
    info!("Using {} backend", app.backend_name());

    let mut failures = 0;
    for input in &inputs {
        if let Err(err) = process_input(&app, input, &output_dir, &args) {
            error!("{}: {err:#}", input.display());
            failures += 1;
        }
    }

    if failures > 0 {
        warn!("{failures} of {} inputs failed", inputs.len());
    }
    Ok(failures == 0)
}

fn process_input(app: &App, input: &Path, output_dir: &Path, args: &Args) -> Result<()> {
    let run = app.run(input)?;
    report_diagnostics(&run);

    if args.stdout {
        for plot in &run.plots {
            println!("{}\n", plot.text);
        }
    } else {
        let paths = output::write_plots(output_dir, &run.plots)?;
        for path in &paths {
            info!("Saved {}", path.display());
        }
        info!(
            "{}: {} graphs written to {}",
            run.name,
            paths.len(),
            output_dir.display()
        );
    }

    if args.export {
        let path = output::export_series(output_dir, &run)
            .with_context(|| format!("failed to export series for {}", run.name))?;
        info!("Exported series to {}", path.display());
    }
    Ok(())
}

fn report_diagnostics(run: &RunOutput) {
    let d = &run.diagnostics;
    info!(
        "{}: sender {}/{} kept, receiver {}/{} kept, {} unclassified",
        run.name,
        d.sender.kept,
        d.sender.total,
        d.receiver.kept,
        d.receiver.total,
        d.unclassified
    );
    if !d.empty_plots.is_empty() {
        warn!("{}: no data for {}", run.name, d.empty_plots.join(", "));
    }
}

fn init_logging(settings: &Settings, verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else if settings.verbose_output {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}
