use crate::generator::profile::build_archive;
use crate::workflow::config::WorkflowConfig;
use anyhow::{bail, Context};
use irucore::archive::{MemoryArchive, TelemetrySource};
use irucore::calibration::CalibrationMatrices;
use irucore::clock::MissionClock;
use irucore::intervals::TimeSpan;
use irucore::pipeline::{CalibrationPipeline, RunOutput};
use irucore::pointing::{PointingErrorAnalyzer, PointingStats};
use irucore::report::{write_pointing_table, ProcessingWindow, TableLayout};
use irucore::selection::load_bad_times;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub struct WorkflowResult {
    pub window: ProcessingWindow,
    pub output: RunOutput,
    pub table_path: PathBuf,
    pub summary_path: PathBuf,
    pub pointing: Option<(PointingStats, PathBuf)>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

fn read_bad_times(path: Option<&Path>, clock: &MissionClock) -> anyhow::Result<Vec<TimeSpan>> {
    match path {
        Some(path) => load_bad_times(path, clock)
            .with_context(|| format!("reading bad times {}", path.display())),
        None => Ok(Vec::new()),
    }
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    fn telemetry(&self, clock: &MissionClock) -> anyhow::Result<MemoryArchive> {
        if self.config.synthetic {
            let matrices = CalibrationMatrices::onboard(clock).context("loading on-board calibration")?;
            return build_archive(&self.config.scenario, &matrices).context("generating synthetic telemetry");
        }
        match &self.config.archive {
            Some(path) => MemoryArchive::load_json(path)
                .with_context(|| format!("loading telemetry archive {}", path.display())),
            None => bail!("no telemetry source: give an archive file or request synthetic telemetry"),
        }
    }

    pub fn execute(&self) -> anyhow::Result<WorkflowResult> {
        let clock = MissionClock;
        let archive = self.telemetry(&clock)?;
        self.execute_with(&archive, &clock)
    }

    pub fn execute_with(
        &self,
        source: &dyn TelemetrySource,
        clock: &MissionClock,
    ) -> anyhow::Result<WorkflowResult> {
        let window = self.config.processing_window(clock)?;
        let span = window
            .span(clock)
            .with_context(|| format!("converting processing window {} to {}", window.start, window.stop))?;
        let bad_times = read_bad_times(self.config.bad_times.as_deref(), clock)?;

        let pipeline = CalibrationPipeline::new(source, self.config.pipeline.clone(), clock)
            .context("initializing calibration pipeline")?;
        let output = pipeline
            .run(span, &bad_times)
            .with_context(|| format!("running calibration over {} to {}", window.start, window.stop))?;

        let out_dir = &self.config.output_dir;
        fs::create_dir_all(out_dir)
            .with_context(|| format!("creating output directory {}", out_dir.display()))?;

        let version = &self.config.version;
        let table_path = out_dir.join(window.table_file(version));
        let mut table = BufWriter::new(
            File::create(&table_path).with_context(|| format!("creating {}", table_path.display()))?,
        );
        TableLayout::from_config(&self.config.pipeline)
            .write(&mut table, &output.accepted(), clock)
            .with_context(|| format!("writing {}", table_path.display()))?;

        let summary_path = out_dir.join(window.summary_file(version));
        let summary = output.summary(&window, version, &self.config.pipeline);
        fs::write(&summary_path, summary.render(clock))
            .with_context(|| format!("writing {}", summary_path.display()))?;

        let pointing = if self.config.pointing_errors {
            let bad_times = read_bad_times(self.config.pointing_bad_times.as_deref(), clock)?;
            let analyzer = PointingErrorAnalyzer::new(self.config.pointing.clone());
            let report = analyzer
                .run(source, span, &bad_times)
                .context("analyzing pointing attitude errors")?;
            let path = out_dir.join(format!("aoatter_{}_{}.out", window.label, version));
            let mut file = BufWriter::new(
                File::create(&path).with_context(|| format!("creating {}", path.display()))?,
            );
            write_pointing_table(&mut file, &report.samples, clock)
                .with_context(|| format!("writing {}", path.display()))?;
            Some((report.stats, path))
        } else {
            None
        };

        Ok(WorkflowResult {
            window,
            output,
            table_path,
            summary_path,
            pointing,
        })
    }
}
