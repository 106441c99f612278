//! Full calibration pass: mode intervals, maneuver selection, then one
//! propagation per surviving maneuver.

use crate::archive::channels::MODE_CHANNELS;
use crate::archive::TelemetrySource;
use crate::calibration::{CalibrationMatrices, SignHistogram};
use crate::clock::DateConverter;
use crate::diagnostics::{LogManager, MetricsRecorder, MetricsSnapshot};
use crate::intervals::TimeSpan;
use crate::prelude::{CalError, CalResult, PipelineConfig};
use crate::propagation::{ManeuverOutcome, ManeuverPropagator, ManeuverRecord, ManeuverState, ManeuverTelemetry};
use crate::report::{ProcessingWindow, RunSummary};
use crate::selection::{ManeuverSelector, ModeIntervals, SelectionStats};

#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub selection: SelectionStats,
    /// One outcome per selected candidate, in maneuver order.
    pub outcomes: Vec<ManeuverOutcome>,
    pub metrics: MetricsSnapshot,
    pub signs: SignHistogram,
}

impl RunOutput {
    pub fn accepted(&self) -> Vec<&ManeuverRecord> {
        self.outcomes.iter().filter_map(ManeuverOutcome::accepted).collect()
    }

    pub fn summary(&self, window: &ProcessingWindow, version: &str, config: &PipelineConfig) -> RunSummary {
        let accepted = self.accepted();
        RunSummary {
            version: version.to_string(),
            start: window.start.clone(),
            stop: window.stop.clone(),
            npnt_min_duration: config.npnt_min_duration,
            kalman_settle_time: config.kalman_settle_time,
            input_maneuvers: self.selection.nman_raw,
            output_maneuvers: accepted.len(),
            first_initial: accepted.first().map(|r| r.initial.time),
            last_final: accepted.last().map(|r| r.final_attitude.time),
            output_file: window.table_file(version),
        }
    }
}

pub struct CalibrationPipeline<'a> {
    source: &'a dyn TelemetrySource,
    config: PipelineConfig,
    matrices: CalibrationMatrices,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl<'a> CalibrationPipeline<'a> {
    pub fn new(
        source: &'a dyn TelemetrySource,
        config: PipelineConfig,
        clock: &impl DateConverter,
    ) -> CalResult<Self> {
        Ok(Self {
            source,
            config,
            matrices: CalibrationMatrices::onboard(clock)?,
            metrics: MetricsRecorder::new(),
            logger: LogManager::scoped("pipeline"),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, window: TimeSpan, bad_times: &[TimeSpan]) -> CalResult<RunOutput> {
        let modes = self
            .source
            .fetch(&MODE_CHANNELS, window.start, window.stop, true)?;
        let modes = ModeIntervals::from_telemetry(&modes)?;

        let selection = ManeuverSelector::new(&self.config).select(&modes, bad_times)?;
        if selection.candidates.is_empty() {
            self.logger
                .caution("no maneuvers survived selection; output table will be empty");
        }

        let propagator = ManeuverPropagator::new(&self.config, &self.matrices);
        let mut outcomes = Vec::with_capacity(selection.candidates.len());
        for (number, candidate) in selection.candidates.iter().enumerate() {
            self.metrics.record_candidate();
            let telemetry = ManeuverTelemetry::fetch(self.source, candidate.window(), &self.config)?;
            let outcome = propagator.process(number, candidate, &telemetry)?;
            if !outcome.state.is_terminal() {
                return Err(CalError::structural(
                    "maneuver outcome",
                    format!("maneuver {} stopped in state {:?}", number, outcome.state),
                ));
            }
            match &outcome.state {
                ManeuverState::Accepted => self.metrics.record_accepted(),
                ManeuverState::Rejected(reason) => self.metrics.record_rejected(reason.label()),
                _ => {}
            }
            outcomes.push(outcome);
        }

        let signs = SignHistogram::from_codes(
            outcomes
                .iter()
                .filter_map(ManeuverOutcome::accepted)
                .map(|record| record.sign_code),
        );
        for line in signs.render() {
            self.logger.record(&line);
        }

        let metrics = self.metrics.snapshot();
        self.logger.record(&format!(
            "{} candidates, {} accepted, {} rejected {:?}",
            metrics.candidates, metrics.accepted, metrics.rejected, metrics.rejected_by_reason
        ));

        Ok(RunOutput {
            selection: selection.stats,
            outcomes,
            metrics,
            signs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::channels::{ACA_SEQUENCE, AUTO_TRANSITION, PCAD_MODE, RW_BIAS, UNLOAD_STATE};
    use crate::archive::{ChannelSeries, MemoryArchive};
    use crate::clock::MissionClock;

    fn quiet_archive() -> MemoryArchive {
        let times: Vec<f64> = (0..10).map(|k| k as f64 * 600.0).collect();
        let mut archive = MemoryArchive::new();
        archive.insert(PCAD_MODE, ChannelSeries::states(times.clone(), ["NPNT"; 10]));
        archive.insert(ACA_SEQUENCE, ChannelSeries::states(times.clone(), ["KALM"; 10]));
        archive.insert(AUTO_TRANSITION, ChannelSeries::states(times.clone(), ["ENAB"; 10]));
        archive.insert(RW_BIAS, ChannelSeries::states(times.clone(), ["ENAB"; 10]));
        archive.insert(UNLOAD_STATE, ChannelSeries::states(times, ["MON"; 10]));
        archive
    }

    #[test]
    fn no_maneuvers_is_an_empty_run() {
        let archive = quiet_archive();
        let pipeline = CalibrationPipeline::new(&archive, PipelineConfig::default(), &MissionClock).unwrap();
        let output = pipeline.run(TimeSpan::new(0.0, 6000.0), &[]).unwrap();
        assert!(output.outcomes.is_empty());
        assert!(output.accepted().is_empty());
        assert_eq!(output.selection.npnt_raw, 1);
        assert_eq!(output.metrics.candidates, 0);

        let summary = output.summary(&ProcessingWindow::catalog(0), "test", pipeline.config());
        assert_eq!(summary.output_maneuvers, 0);
        assert!(summary.first_initial.is_none());
        assert_eq!(summary.output_file, "getirudata_i00_test.out");
    }

    #[test]
    fn missing_mode_channel_aborts() {
        let archive = MemoryArchive::new();
        let pipeline = CalibrationPipeline::new(&archive, PipelineConfig::default(), &MissionClock).unwrap();
        assert!(matches!(
            pipeline.run(TimeSpan::new(0.0, 6000.0), &[]),
            Err(CalError::MissingChannel(_))
        ));
    }
}
