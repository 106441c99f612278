use clap::Parser;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use workflow::config::{Overrides, WorkflowConfig};
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "IRU scale factor and alignment calibration data generator")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Catalog processing interval number
    #[arg(long)]
    interval: Option<u32>,
    /// Custom window start (YYYY:DDD[:HH:MM:SS.sss]); needs --stop
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    stop: Option<String>,
    /// JSON telemetry archive
    #[arg(long)]
    archive: Option<PathBuf>,
    /// Generate telemetry from the workflow scenario instead of reading an archive
    #[arg(long, default_value_t = false)]
    synthetic: bool,
    #[arg(long)]
    bad_times: Option<PathBuf>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Also characterize pointing attitude errors
    #[arg(long, default_value_t = false)]
    pointing_errors: bool,
    /// Append a JSON line with selection and rejection counts
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunReport<'a> {
    window: &'a str,
    start: &'a str,
    stop: &'a str,
    selection: &'a irucore::selection::SelectionStats,
    metrics: &'a irucore::diagnostics::MetricsSnapshot,
    table: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let overrides = Overrides {
        interval: args.interval,
        start: args.start,
        stop: args.stop,
        archive: args.archive,
        synthetic: args.synthetic,
        bad_times: args.bad_times,
        output_dir: args.output_dir,
        pointing_errors: args.pointing_errors,
    };
    let workflow_config = match args.workflow {
        Some(path) => WorkflowConfig::load(path)?.with_overrides(overrides),
        None => WorkflowConfig::from_args(overrides),
    };

    let result = Runner::new(workflow_config).execute()?;
    println!(
        "Window {} ({} to {}) -> maneuvers in {}, out {}, table {}",
        result.window.label,
        result.window.start,
        result.window.stop,
        result.output.selection.nman_raw,
        result.output.accepted().len(),
        result.table_path.display()
    );
    if let Some((stats, path)) = &result.pointing {
        println!(
            "Pointing errors -> {} of {} retained, rms {:.3} arcsec, max {:.3} arcsec, table {}",
            stats.retained,
            stats.samples,
            stats.rms_yz,
            stats.max_yz,
            path.display()
        );
    }

    if let Some(report_path) = args.report {
        let report = RunReport {
            window: &result.window.label,
            start: &result.window.start,
            stop: &result.window.stop,
            selection: &result.output.selection,
            metrics: &result.output.metrics,
            table: result.table_path.display().to_string(),
        };
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(report_path)?;
        writeln!(file, "{}", serde_json::to_string(&report)?)?;
    }

    Ok(())
}
