//! Attitude-error characterization during stable pointing.
//!
//! Samples of the on-board attitude error are kept when they fall inside a
//! pointing interval (optionally trimmed to Kalman convergence plus settling)
//! and outside momentum dumps, reaction-wheel bias disables and listed bad
//! times.

use crate::archive::channels::{ATTITUDE_ERROR, MODE_CHANNELS};
use crate::archive::TelemetrySource;
use crate::diagnostics::LogManager;
use crate::intervals::{Interval, TimeSpan};
use crate::math::StatsHelper;
use crate::prelude::CalResult;
use crate::selection::ModeIntervals;
use serde::{Deserialize, Serialize};

pub const ARCSEC_PER_RADIAN: f64 = 180.0 / std::f64::consts::PI * 3600.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PointingConfig {
    pub settle_time: f64,
    pub dump_damping: f64,
    pub bad_error_limit_arcsec: f64,
    /// Move each pointing start to the last Kalman start inside it plus `settle_time`.
    pub adjust_kalman: bool,
    pub extend_dumps: bool,
    pub filter_dumps: bool,
    pub filter_rwbias: bool,
    pub filter_bad_times: bool,
}

impl Default for PointingConfig {
    fn default() -> Self {
        Self {
            settle_time: 300.0,
            dump_damping: 180.0,
            bad_error_limit_arcsec: 1.0,
            adjust_kalman: true,
            extend_dumps: true,
            filter_dumps: true,
            filter_rwbias: true,
            filter_bad_times: true,
        }
    }
}

/// Roll, pitch and yaw attitude error (rad).
#[derive(Debug, Clone, Default)]
pub struct AttitudeErrors {
    pub times: Vec<f64>,
    pub errors: Vec<[f64; 3]>,
}

impl AttitudeErrors {
    pub fn fetch(source: &dyn TelemetrySource, window: TimeSpan) -> CalResult<Self> {
        let set = source.fetch(&ATTITUDE_ERROR, window.start, window.stop, true)?;
        let (times, errors) = set.numeric_columns(ATTITUDE_ERROR)?;
        Ok(Self { times, errors })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Pitch/yaw error magnitude per sample.
    pub fn yz(&self) -> Vec<f64> {
        self.errors
            .iter()
            .map(|e| (e[1] * e[1] + e[2] * e[2]).sqrt())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointingSample {
    pub time: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub yz: f64,
}

/// Sample counts after each mask, plus statistics of what is retained.
/// Error statistics are in arcsec.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointingStats {
    pub samples: usize,
    pub npnt_intervals: usize,
    pub kalman_adjusted: usize,
    pub in_npnt: usize,
    pub in_dumps: usize,
    pub in_rwbias: usize,
    pub in_bad_times: usize,
    pub retained: usize,
    pub rms_yz: f64,
    pub max_yz: f64,
    pub above_limit: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PointingReport {
    pub stats: PointingStats,
    pub samples: Vec<PointingSample>,
}

pub struct PointingErrorAnalyzer {
    config: PointingConfig,
    logger: LogManager,
}

fn inside_any(time: f64, spans: &[TimeSpan]) -> bool {
    spans.iter().any(|span| span.contains(time))
}

impl PointingErrorAnalyzer {
    pub fn new(config: PointingConfig) -> Self {
        Self {
            config,
            logger: LogManager::scoped("pointing"),
        }
    }

    /// Pointing spans, with each start moved past the last Kalman start
    /// strictly inside it when adjustment is enabled. The second value counts
    /// adjusted spans.
    pub fn settled_pointing(&self, npnt: &[Interval], kalm: &[Interval]) -> (Vec<TimeSpan>, usize) {
        let mut adjusted = 0;
        let spans = npnt
            .iter()
            .map(|interval| {
                let mut span = TimeSpan::from(interval);
                if !self.config.adjust_kalman {
                    return span;
                }
                let last_kalman = kalm
                    .iter()
                    .map(|k| k.start_time)
                    .filter(|&t| interval.start_time < t && t < interval.stop_time)
                    .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t))));
                if let Some(kalman) = last_kalman {
                    span.start = kalman + self.config.settle_time;
                    adjusted += 1;
                }
                span
            })
            .collect();
        (spans, adjusted)
    }

    pub fn analyze(
        &self,
        modes: &ModeIntervals,
        errors: &AttitudeErrors,
        bad_times: &[TimeSpan],
    ) -> PointingReport {
        let (pointing, kalman_adjusted) = self.settled_pointing(&modes.npnt, &modes.kalm);
        let damping = if self.config.extend_dumps {
            self.config.dump_damping
        } else {
            0.0
        };
        let dumps: Vec<TimeSpan> = modes
            .grnd
            .iter()
            .map(|dump| TimeSpan::new(dump.start_time, dump.stop_time + damping))
            .collect();
        let rwbias: Vec<TimeSpan> = modes.rwbias_disa.iter().map(TimeSpan::from).collect();

        let yz = errors.yz();
        let mut stats = PointingStats {
            samples: errors.len(),
            npnt_intervals: pointing.len(),
            kalman_adjusted,
            ..Default::default()
        };
        let mut samples = Vec::new();

        for (idx, &time) in errors.times.iter().enumerate() {
            let in_npnt = inside_any(time, &pointing);
            let in_dump = self.config.filter_dumps && inside_any(time, &dumps);
            let in_rwbias = self.config.filter_rwbias && inside_any(time, &rwbias);
            let in_bad = self.config.filter_bad_times && inside_any(time, bad_times);
            stats.in_npnt += usize::from(in_npnt);
            stats.in_dumps += usize::from(in_dump);
            stats.in_rwbias += usize::from(in_rwbias);
            stats.in_bad_times += usize::from(in_bad);

            if in_npnt && !in_dump && !in_rwbias && !in_bad {
                let [roll, pitch, yaw] = errors.errors[idx];
                samples.push(PointingSample {
                    time,
                    roll,
                    pitch,
                    yaw,
                    yz: yz[idx],
                });
            }
        }

        let retained_yz: Vec<f64> = samples.iter().map(|s| s.yz * ARCSEC_PER_RADIAN).collect();
        stats.retained = samples.len();
        stats.rms_yz = StatsHelper::rms(&retained_yz);
        stats.max_yz = StatsHelper::max(&retained_yz).unwrap_or(0.0);
        stats.above_limit = retained_yz
            .iter()
            .filter(|&&e| e > self.config.bad_error_limit_arcsec)
            .count();

        self.logger.record(&format!(
            "{} attitude errors, {} in NPNT, {} in dumps, {} in RW bias disable, {} in bad times, {} retained",
            stats.samples, stats.in_npnt, stats.in_dumps, stats.in_rwbias, stats.in_bad_times, stats.retained
        ));
        self.logger.record(&format!(
            "YZ error rms {:.3} arcsec, max {:.3} arcsec, {} above {:.2} arcsec",
            stats.rms_yz, stats.max_yz, stats.above_limit, self.config.bad_error_limit_arcsec
        ));

        PointingReport { stats, samples }
    }

    /// Fetches mode and attitude-error telemetry over `window` and analyzes it.
    pub fn run(
        &self,
        source: &dyn TelemetrySource,
        window: TimeSpan,
        bad_times: &[TimeSpan],
    ) -> CalResult<PointingReport> {
        let modes = source.fetch(&MODE_CHANNELS, window.start, window.stop, true)?;
        let modes = ModeIntervals::from_telemetry(&modes)?;
        self.logger.record(&format!(
            "NPNT {}, NMAN {}, KALM {}, dumps {}, RW bias disables {}",
            modes.npnt.len(),
            modes.nman.len(),
            modes.kalm.len(),
            modes.grnd.len(),
            modes.rwbias_disa.len()
        ));
        let errors = AttitudeErrors::fetch(source, window)?;
        Ok(self.analyze(&modes, &errors, bad_times))
    }
}
