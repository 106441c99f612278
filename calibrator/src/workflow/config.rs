use crate::generator::profile::{scenario_span, ScenarioConfig};
use anyhow::{bail, Context};
use irucore::clock::DateConverter;
use irucore::pointing::PointingConfig;
use irucore::prelude::PipelineConfig;
use irucore::report::ProcessingWindow;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Catalog window used when neither dates nor an interval number are given.
const DEFAULT_INTERVAL: u32 = 29;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Run version label carried into output file names.
    pub version: String,
    pub interval: Option<u32>,
    pub start: Option<String>,
    pub stop: Option<String>,
    /// JSON telemetry archive.
    pub archive: Option<PathBuf>,
    pub synthetic: bool,
    pub scenario: ScenarioConfig,
    pub bad_times: Option<PathBuf>,
    /// Bad times applied to the attitude-error analysis only.
    pub pointing_bad_times: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub pointing_errors: bool,
    pub pipeline: PipelineConfig,
    pub pointing: PointingConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            version: "v01".into(),
            interval: None,
            start: None,
            stop: None,
            archive: None,
            synthetic: false,
            scenario: ScenarioConfig::default(),
            bad_times: None,
            pointing_bad_times: None,
            output_dir: PathBuf::from("."),
            pointing_errors: false,
            pipeline: PipelineConfig::default(),
            pointing: PointingConfig::default(),
        }
    }
}

/// Command-line values that take precedence over the workflow file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub interval: Option<u32>,
    pub start: Option<String>,
    pub stop: Option<String>,
    pub archive: Option<PathBuf>,
    pub synthetic: bool,
    pub bad_times: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub pointing_errors: bool,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(overrides: Overrides) -> Self {
        Self::default().with_overrides(overrides)
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if overrides.interval.is_some() {
            self.interval = overrides.interval;
        }
        if overrides.start.is_some() {
            self.start = overrides.start;
        }
        if overrides.stop.is_some() {
            self.stop = overrides.stop;
        }
        if overrides.archive.is_some() {
            self.archive = overrides.archive;
            self.synthetic = false;
        }
        if overrides.bad_times.is_some() {
            self.bad_times = overrides.bad_times;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        self.synthetic |= overrides.synthetic;
        self.pointing_errors |= overrides.pointing_errors;
        self
    }

    /// Explicit dates win over an interval number. Synthetic runs without
    /// either cover the whole generated scenario.
    pub fn processing_window(&self, clock: &impl DateConverter) -> anyhow::Result<ProcessingWindow> {
        match (&self.start, &self.stop) {
            (Some(start), Some(stop)) => return Ok(ProcessingWindow::custom(start, stop)),
            (None, None) => {}
            _ => bail!("processing window needs both a start and a stop date"),
        }
        match self.interval {
            Some(number) => Ok(ProcessingWindow::catalog(number)),
            None if self.synthetic => {
                let span = scenario_span(&self.scenario)?;
                Ok(ProcessingWindow::custom(
                    clock.to_date(span.start),
                    clock.to_date(span.stop),
                ))
            }
            None => Ok(ProcessingWindow::catalog(DEFAULT_INTERVAL)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irucore::clock::MissionClock;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_applies_overrides() {
        let cfg = WorkflowConfig::from_args(Overrides {
            interval: Some(30),
            synthetic: true,
            ..Default::default()
        });
        assert!(cfg.synthetic);
        assert_eq!(cfg.processing_window(&MissionClock).unwrap().label, "i30a");
        assert_eq!(cfg.pipeline.npnt_min_duration, 1200.0);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"version: v33c\nstart: '2012:336'\nstop: '2013:021'\npipeline:\n  kalman_settle_time: 360.0\n  write_signs: true\nscenario:\n  angle_deg: 20.0\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.version, "v33c");
        assert_eq!(cfg.pipeline.kalman_settle_time, 360.0);
        assert!(cfg.pipeline.write_signs);
        assert_eq!(cfg.pipeline.dump_damping, 180.0);
        assert_eq!(cfg.scenario.angle_deg, 20.0);
        let window = cfg.processing_window(&MissionClock).unwrap();
        assert_eq!(window.label, "i00");
        assert_eq!(window.start, "2012:336");
    }

    #[test]
    fn window_selection_rules() {
        let half = WorkflowConfig {
            start: Some("2012:336".into()),
            ..Default::default()
        };
        assert!(half.processing_window(&MissionClock).is_err());
        assert_eq!(
            WorkflowConfig::default().processing_window(&MissionClock).unwrap().label,
            "i29c"
        );

        let synthetic = WorkflowConfig {
            synthetic: true,
            ..Default::default()
        };
        let window = synthetic.processing_window(&MissionClock).unwrap();
        let span = window.span(&MissionClock).unwrap();
        assert_eq!(span.start, synthetic.scenario.start);
    }

    #[test]
    fn archive_override_disables_synthetic() {
        let cfg = WorkflowConfig {
            synthetic: true,
            ..Default::default()
        }
        .with_overrides(Overrides {
            archive: Some(PathBuf::from("telemetry.json")),
            ..Default::default()
        });
        assert!(!cfg.synthetic);
        assert_eq!(cfg.archive, Some(PathBuf::from("telemetry.json")));
    }
}
