use anyhow::{bail, Context};
use irucore::archive::channels::{
    ACA_SEQUENCE, ATTITUDE, ATTITUDE_ERROR, AUTO_TRANSITION, GYRO_BIAS, GYRO_COUNTS, KALM, NMAN,
    NPNT, ORBIT_VELOCITY, PCAD_MODE, RW_BIAS, SOLAR_VELOCITY, UNLOAD_STATE,
};
use irucore::archive::{ChannelSeries, MemoryArchive};
use irucore::calibration::CalibrationMatrices;
use irucore::intervals::TimeSpan;
use irucore::math::{MatrixHelper, Quaternion, RotationVector};
use irucore::pointing::ARCSEC_PER_RADIAN;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Spacing of the ephemeris samples (sec).
const EPHEMERIS_STEP: f64 = 300.0;

/// Synthetic pointing/maneuver sequence. Durations are rounded to whole
/// sample periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Mission seconds of the first sample.
    pub start: f64,
    pub sample_period: f64,
    pub maneuvers: usize,
    pub pointing_duration: f64,
    pub maneuver_duration: f64,
    /// Time from the end of a maneuver to Kalman convergence (sec).
    pub kalman_delay: f64,
    pub angle_deg: f64,
    /// Rotation axes, used in turn.
    pub axes: Vec<[f64; 3]>,
    pub initial_attitude: [f64; 4],
    /// Gyro channel bias (counts/sec).
    pub channel_bias: [f64; 4],
    /// Half-width of the uniform jitter on each count reading.
    pub count_noise: f64,
    /// Half-width of the uniform pointing attitude error (arcsec).
    pub attitude_error_arcsec: f64,
    /// Ground momentum dumps, seconds from `start`.
    pub dumps: Vec<[f64; 2]>,
    pub seed: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            start: 4.5e8,
            sample_period: 1.025,
            maneuvers: 1,
            pointing_duration: 3000.0,
            maneuver_duration: 600.0,
            kalman_delay: 60.0,
            angle_deg: 10.0,
            axes: vec![[0.48, -0.6, 0.64]],
            initial_attitude: [0.1, -0.2, 0.3, 0.9],
            channel_bias: [0.0; 4],
            count_noise: 0.0,
            attitude_error_arcsec: 0.2,
            dumps: Vec::new(),
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Pointing after `completed` maneuvers, `step` samples into the interval.
    Pointing { completed: usize, step: usize },
    Maneuver { index: usize, step: usize },
}

/// Sample-index layout of the scenario.
struct Timeline {
    pointing: usize,
    maneuver: usize,
    kalman_delay: usize,
    maneuvers: usize,
}

impl Timeline {
    fn new(config: &ScenarioConfig) -> anyhow::Result<Self> {
        if config.sample_period <= 0.0 {
            bail!("sample period must be positive, got {}", config.sample_period);
        }
        let samples = |duration: f64| (duration / config.sample_period).round() as usize;
        let timeline = Self {
            pointing: samples(config.pointing_duration),
            maneuver: samples(config.maneuver_duration),
            kalman_delay: samples(config.kalman_delay),
            maneuvers: config.maneuvers,
        };
        if timeline.pointing < 2 || timeline.maneuver < 2 {
            bail!("pointing and maneuver intervals need at least two samples each");
        }
        Ok(timeline)
    }

    fn len(&self) -> usize {
        self.maneuvers * (self.pointing + self.maneuver) + self.pointing
    }

    fn phase(&self, sample: usize) -> Phase {
        let cycle = self.pointing + self.maneuver;
        let (index, offset) = (sample / cycle, sample % cycle);
        if index >= self.maneuvers || offset < self.pointing {
            Phase::Pointing {
                completed: index.min(self.maneuvers),
                step: offset,
            }
        } else {
            Phase::Maneuver {
                index,
                step: offset - self.pointing,
            }
        }
    }

    fn converged(&self, phase: Phase) -> bool {
        match phase {
            Phase::Pointing { completed: 0, .. } => true,
            Phase::Pointing { step, .. } => step >= self.kalman_delay,
            Phase::Maneuver { .. } => false,
        }
    }
}

/// Time span covered by the scenario's samples.
pub fn scenario_span(config: &ScenarioConfig) -> anyhow::Result<TimeSpan> {
    let timeline = Timeline::new(config)?;
    let last = timeline.len().saturating_sub(1) as f64;
    Ok(TimeSpan::new(config.start, config.start + last * config.sample_period))
}

fn unit_axes(config: &ScenarioConfig) -> anyhow::Result<Vec<[f64; 3]>> {
    if config.axes.is_empty() {
        bail!("scenario needs at least one rotation axis");
    }
    config
        .axes
        .iter()
        .map(|axis| {
            let norm = MatrixHelper::norm3(axis);
            if norm == 0.0 {
                bail!("rotation axis {:?} has zero length", axis);
            }
            Ok(axis.map(|c| c / norm))
        })
        .collect()
}

fn jitter(rng: &mut StdRng, half_width: f64) -> f64 {
    if half_width > 0.0 {
        rng.gen_range(-half_width..half_width)
    } else {
        0.0
    }
}

/// Builds every channel the calibration and pointing workflows fetch.
pub fn build_archive(
    config: &ScenarioConfig,
    matrices: &CalibrationMatrices,
) -> anyhow::Result<MemoryArchive> {
    let timeline = Timeline::new(config)?;
    let axes = unit_axes(config)?;
    let angle = config.angle_deg.to_radians();
    let axis_of = |index: usize| axes[index % axes.len()];
    let mut rng = StdRng::seed_from_u64(config.seed);

    // attitude at the start of each pointing interval
    let mut settled = vec![Quaternion::new(config.start, config.initial_attitude).normalize()];
    for index in 0..timeline.maneuvers {
        let turn = RotationVector::new(0.0, axis_of(index).map(|c| c * angle));
        let next = settled[index].multiply(&Quaternion::from_vector(&turn)).normalize();
        settled.push(next);
    }

    let n = timeline.len();
    let times: Vec<f64> = (0..n)
        .map(|i| config.start + i as f64 * config.sample_period)
        .collect();
    let mut pcad_mode = Vec::with_capacity(n);
    let mut aca_sequence = Vec::with_capacity(n);
    let mut unload = Vec::with_capacity(n);
    let mut attitude: [Vec<f64>; 4] = Default::default();
    let mut counts: [Vec<f64>; 4] = Default::default();
    let mut errors: [Vec<f64>; 3] = Default::default();
    let mut accumulated = [0.0; 4];
    let mut previous_angles = [0.0; 4];
    let error_scale = config.attitude_error_arcsec / ARCSEC_PER_RADIAN;

    for (i, &time) in times.iter().enumerate() {
        let phase = timeline.phase(i);
        // rotation completed within the current maneuver, plus the channel
        // angle of every maneuver already finished
        let (quat, rotation, completed) = match phase {
            Phase::Pointing { completed, .. } => (settled[completed], [0.0; 3], completed),
            Phase::Maneuver { index, step } => {
                let fraction = step as f64 / timeline.maneuver as f64;
                let turn = RotationVector::new(time, axis_of(index).map(|c| c * angle * fraction));
                let quat = settled[index].multiply(&Quaternion::from_vector(&turn)).normalize();
                (quat, turn.v, index)
            }
        };
        for (component, value) in attitude.iter_mut().zip(quat.q) {
            component.push(value);
        }

        for k in 0..4 {
            let axis = matrices.channel_axis(k);
            let finished: f64 = (0..completed)
                .map(|index| MatrixHelper::dot3(&axis, &axis_of(index)) * angle)
                .sum();
            let channel_angle = finished + MatrixHelper::dot3(&axis, &rotation);
            let step_angle = channel_angle - previous_angles[k];
            previous_angles[k] = channel_angle;
            let sf = if step_angle >= 0.0 {
                matrices.sf_pos[k]
            } else {
                matrices.sf_neg[k]
            };
            if i > 0 {
                accumulated[k] += step_angle / sf + config.channel_bias[k] * config.sample_period;
            }
            let reading = (accumulated[k] + jitter(&mut rng, config.count_noise)).floor();
            counts[k].push((reading as i64 as i16) as f64);
        }

        let is_maneuver = matches!(phase, Phase::Maneuver { .. });
        let scale = if is_maneuver { 50.0 * error_scale } else { error_scale };
        for axis in errors.iter_mut() {
            axis.push(jitter(&mut rng, scale));
        }

        pcad_mode.push(if is_maneuver { NMAN } else { NPNT });
        aca_sequence.push(if timeline.converged(phase) { KALM } else { "GUID" });
        let offset = time - config.start;
        let dumping = config
            .dumps
            .iter()
            .any(|[from, to]| *from <= offset && offset <= *to);
        unload.push(if dumping { "GRND" } else { "MON" });
    }

    let mut archive = MemoryArchive::new();
    archive.insert(PCAD_MODE, ChannelSeries::states(times.clone(), pcad_mode));
    archive.insert(ACA_SEQUENCE, ChannelSeries::states(times.clone(), aca_sequence));
    archive.insert(UNLOAD_STATE, ChannelSeries::states(times.clone(), unload));
    for name in [AUTO_TRANSITION, RW_BIAS] {
        archive.insert(name, ChannelSeries::states(times.clone(), vec!["ENAB"; n]));
    }
    for (name, values) in ATTITUDE.iter().zip(attitude) {
        archive.insert(*name, ChannelSeries::numeric(times.clone(), values));
    }
    for (name, values) in GYRO_COUNTS.iter().zip(counts) {
        archive.insert(*name, ChannelSeries::numeric(times.clone(), values));
    }
    for (name, values) in ATTITUDE_ERROR.iter().zip(errors) {
        archive.insert(*name, ChannelSeries::numeric(times.clone(), values));
    }

    // on-board bias estimate consistent with the channel bias
    let sf_ave = matrices.sf_ave();
    let channel_rate: [f64; 4] = std::array::from_fn(|k| config.channel_bias[k] * sf_ave[k]);
    for (axis, name) in GYRO_BIAS.iter().enumerate() {
        let value: f64 = (0..4)
            .map(|k| matrices.gmat[[axis, k]] * channel_rate[k])
            .sum();
        archive.insert(*name, ChannelSeries::numeric(times.clone(), vec![value; n]));
    }

    insert_ephemeris(&mut archive, &times).context("building ephemeris channels")?;
    Ok(archive)
}

/// Slowly varying spacecraft and solar velocities (m/sec) covering the
/// samples with a margin on both sides.
fn insert_ephemeris(archive: &mut MemoryArchive, times: &[f64]) -> anyhow::Result<()> {
    let (Some(&first), Some(&last)) = (times.first(), times.last()) else {
        bail!("no samples to cover");
    };
    let margin = 6.0 * EPHEMERIS_STEP;
    let count = ((last - first + 2.0 * margin) / EPHEMERIS_STEP).ceil() as usize + 1;
    let ephemeris_times: Vec<f64> = (0..count)
        .map(|k| first - margin + k as f64 * EPHEMERIS_STEP)
        .collect();
    let orbit_period = 2.3e5;
    let year = 3.15576e7;
    let phase = |t: f64, period: f64| 2.0 * std::f64::consts::PI * t / period;

    let spacecraft: [Vec<f64>; 3] = [
        ephemeris_times.iter().map(|&t| 1500.0 * phase(t, orbit_period).cos()).collect(),
        ephemeris_times.iter().map(|&t| 1500.0 * phase(t, orbit_period).sin()).collect(),
        vec![-300.0; count],
    ];
    let solar: [Vec<f64>; 3] = [
        ephemeris_times.iter().map(|&t| 29_780.0 * phase(t, year).sin()).collect(),
        ephemeris_times.iter().map(|&t| -29_780.0 * phase(t, year).cos()).collect(),
        vec![0.0; count],
    ];
    for (name, values) in ORBIT_VELOCITY.iter().zip(spacecraft) {
        archive.insert(*name, ChannelSeries::numeric(ephemeris_times.clone(), values));
    }
    for (name, values) in SOLAR_VELOCITY.iter().zip(solar) {
        archive.insert(*name, ChannelSeries::numeric(ephemeris_times.clone(), values));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use irucore::archive::TelemetrySource;
    use irucore::clock::MissionClock;
    use irucore::selection::ModeIntervals;

    fn matrices() -> CalibrationMatrices {
        CalibrationMatrices::onboard(&MissionClock).unwrap()
    }

    #[test]
    fn scenario_produces_every_channel() {
        let config = ScenarioConfig::default();
        let archive = build_archive(&config, &matrices()).unwrap();
        let names: Vec<&str> = archive.channel_names().collect();
        assert_eq!(names.len(), 5 + 4 + 4 + 3 + 3 + 3 + 3);

        let span = scenario_span(&config).unwrap();
        let set = archive
            .fetch(&GYRO_COUNTS, span.start, span.stop, true)
            .unwrap();
        let (times, counts) = set.numeric_columns(GYRO_COUNTS).unwrap();
        assert_eq!(times.len(), 2927 + 585 + 2927);
        assert!(counts.iter().flatten().all(|c| (-32768.0..=32767.0).contains(c)));
    }

    #[test]
    fn mode_sequence_has_one_maneuver_between_pointing() {
        let config = ScenarioConfig::default();
        let archive = build_archive(&config, &matrices()).unwrap();
        let span = scenario_span(&config).unwrap();
        let set = archive
            .fetch(&irucore::archive::channels::MODE_CHANNELS, span.start, span.stop, true)
            .unwrap();
        let modes = ModeIntervals::from_telemetry(&set).unwrap();
        assert_eq!(modes.npnt.len(), 2);
        assert_eq!(modes.nman.len(), 1);
        assert_eq!(modes.kalm.len(), 2);
        assert_eq!(modes.nman[0].start_index, 2927);
        assert_eq!(modes.kalm[1].start_index, 2927 + 585 + 59);
        assert!(modes.grnd.is_empty());
    }

    #[test]
    fn same_seed_same_noise() {
        let config = ScenarioConfig {
            count_noise: 2.0,
            seed: 7,
            ..Default::default()
        };
        let first = build_archive(&config, &matrices()).unwrap();
        let second = build_archive(&config, &matrices()).unwrap();
        let span = scenario_span(&config).unwrap();
        let a = first.fetch(&ATTITUDE_ERROR, span.start, span.stop, false).unwrap();
        let b = second.fetch(&ATTITUDE_ERROR, span.start, span.stop, false).unwrap();
        assert_eq!(
            a.numeric_columns(ATTITUDE_ERROR).unwrap(),
            b.numeric_columns(ATTITUDE_ERROR).unwrap()
        );
    }

    #[test]
    fn degenerate_scenarios_are_refused() {
        let config = ScenarioConfig {
            axes: vec![[0.0; 3]],
            ..Default::default()
        };
        assert!(build_archive(&config, &matrices()).is_err());
        let config = ScenarioConfig {
            sample_period: 0.0,
            ..Default::default()
        };
        assert!(scenario_span(&config).is_err());
    }
}
