use crate::calibration::{
    align_rate_timing, resolve_rollover, sign_code, CalibrationMatrices, CountRates, RateCalibrator,
};
use crate::diagnostics::LogManager;
use crate::math::{MatrixHelper, Quaternion, RotationVector, StatsHelper};
use crate::prelude::{CalResult, PipelineConfig};
use crate::propagation::record::{
    BiasStats, ChannelBias, ManeuverOutcome, ManeuverRecord, ManeuverState, PropagationSums,
    RejectReason,
};
use crate::propagation::telemetry::ManeuverTelemetry;
use crate::selection::ManeuverCandidate;
use ndarray::Array2;

/// Slack when matching gyro sample times against attitude times (sec).
const TIME_SLACK: f64 = 0.01;

/// Integrates calibrated gyro rates across each maneuver and compares the
/// result with the attitude solution.
pub struct ManeuverPropagator<'a> {
    config: &'a PipelineConfig,
    matrices: &'a CalibrationMatrices,
    dmat: Array2<f64>,
    logger: LogManager,
}

/// Maneuver bookkeeping that stops the current candidate without failing the run.
type Step<T> = Result<T, RejectReason>;

impl<'a> ManeuverPropagator<'a> {
    pub fn new(config: &'a PipelineConfig, matrices: &'a CalibrationMatrices) -> Self {
        Self {
            config,
            matrices,
            dmat: MatrixHelper::from_rows3(&config.dmat),
            logger: LogManager::scoped("propagator"),
        }
    }

    /// Runs one candidate to a terminal state. Only structural telemetry
    /// faults surface as errors.
    pub fn process(
        &self,
        number: usize,
        candidate: &ManeuverCandidate,
        telemetry: &ManeuverTelemetry,
    ) -> CalResult<ManeuverOutcome> {
        let mut state = ManeuverState::Candidate;
        let propagated = self.propagate(number, candidate, telemetry, &mut state)?;

        let (state, record) = match propagated {
            Ok(record) => {
                let verdict = self.acceptance(&record);
                let state = match verdict {
                    Ok(()) => ManeuverState::Accepted,
                    Err(reason) => ManeuverState::Rejected(reason),
                };
                (state, Some(record))
            }
            Err(reason) => (ManeuverState::Rejected(reason), None),
        };

        match &state {
            ManeuverState::Rejected(reason) => self.logger.caution(&format!(
                "maneuver {} at {:.3} rejected: {}",
                number, candidate.nman.start_time, reason
            )),
            _ => {
                let elapsed = record.as_ref().map_or(0.0, ManeuverRecord::elapsed);
                self.logger
                    .detail(&format!("maneuver {} accepted over {:.3} s", number, elapsed))
            }
        }

        Ok(ManeuverOutcome {
            nman: candidate.nman,
            state,
            record,
        })
    }

    fn advance(&self, number: usize, state: &mut ManeuverState, next: ManeuverState) {
        self.logger
            .detail(&format!("maneuver {}: {:?} -> {:?}", number, state, next));
        *state = next;
    }

    fn propagate(
        &self,
        number: usize,
        candidate: &ManeuverCandidate,
        telemetry: &ManeuverTelemetry,
        state: &mut ManeuverState,
    ) -> CalResult<Step<ManeuverRecord>> {
        let (initial, final_attitude) = match self.resolve_attitudes(candidate, telemetry) {
            Ok(pair) => pair,
            Err(reason) => return Ok(Err(reason)),
        };
        let observed_rotation = initial
            .conjugate()
            .multiply(&final_attitude)
            .normalize()
            .with_time(final_attitude.time - initial.time);
        let observed_vector = observed_rotation.to_vector();
        self.advance(number, state, ManeuverState::IntervalsResolved);

        let counts = resolve_rollover(&telemetry.gyro_times, &telemetry.gyro_counts)?;
        let rates = &counts.rates;
        if rates.is_empty() {
            return Ok(Err(RejectReason::InsufficientTelemetry("no gyro rates")));
        }

        let start = counts.times.iter().rposition(|&t| t <= initial.time + TIME_SLACK);
        let stop = counts.times.iter().position(|&t| t >= final_attitude.time - TIME_SLACK);
        let (Some(start), Some(stop)) = (start, stop) else {
            return Ok(Err(RejectReason::InsufficientTelemetry(
                "gyro counts do not span the maneuver",
            )));
        };
        let count_difference: [i64; 4] = std::array::from_fn(|k| {
            (counts.adjusted[stop][k] - counts.adjusted[start][k]).round() as i64
        });

        let (bias_before, bias_after) =
            match self.bias_statistics(candidate, &counts.times, rates, final_attitude.time) {
                Ok(bias) => bias,
                Err(reason) => return Ok(Err(reason)),
            };
        let average_bias = ChannelBias::average(&bias_before, &bias_after);
        let bias_difference = ChannelBias::difference(&bias_before, &bias_after);

        let Some(pcad_index) = telemetry
            .bias_times
            .iter()
            .position(|&t| t >= candidate.nman.start_time)
        else {
            return Ok(Err(RejectReason::InsufficientTelemetry(
                "no on-board bias at maneuver start",
            )));
        };
        let pcad_bias = telemetry.pcad_bias[pcad_index];

        let (bias4, bias3) = if self.config.use_average_bias {
            (average_bias.counts, [0.0; 3])
        } else {
            ([0.0; 4], pcad_bias)
        };
        let mmat = match rates.times.last() {
            Some(&last) if self.config.apply_onboard_mmat => self.matrices.mmat_at(last),
            _ => Array2::zeros((3, 3)),
        };
        let calibrator = RateCalibrator::new(self.matrices, self.dmat.view(), mmat.view());
        let mut body = calibrator.calibrate(&rates.counts, bias4, bias3).body;
        align_rate_timing(&mut body);
        self.advance(number, state, ManeuverState::RatesCalibrated);

        let begin = rates.times.iter().position(|&t| t > initial.time);
        let end = rates.times.iter().rposition(|&t| t - TIME_SLACK <= final_attitude.time);
        let (begin, end) = match (begin, end) {
            (Some(begin), Some(end)) if begin <= end => (begin, end),
            _ => {
                return Ok(Err(RejectReason::InsufficientTelemetry(
                    "no gyro rates between initial and final attitude",
                )))
            }
        };

        let integration = self.integrate(rates, &body, begin, end);
        let propagated_final = initial.multiply(&integration.rotation).normalize();
        let residual = propagated_final
            .conjugate()
            .multiply(&final_attitude)
            .normalize();
        let residual_vector = residual.to_vector();
        self.advance(number, state, ManeuverState::AttitudePropagated);

        Ok(Ok(ManeuverRecord {
            nman: candidate.nman,
            initial,
            final_attitude,
            maneuver_rotation: integration.rotation,
            integrated_rate: integration.integrated_rate,
            count_difference,
            observed_rotation,
            observed_vector,
            propagated_final,
            residual,
            residual_yz: residual_vector.yz_magnitude(),
            residual_vector,
            sums: integration.sums,
            pcad_bias_time: telemetry.bias_times[pcad_index],
            pcad_bias,
            bias_before,
            bias_after,
            average_bias,
            bias_difference,
            sign_code: sign_code(self.matrices, &observed_vector.v),
        }))
    }

    /// Last attitude before the maneuver starts and first attitude once the
    /// Kalman filter has settled after it.
    fn resolve_attitudes(
        &self,
        candidate: &ManeuverCandidate,
        telemetry: &ManeuverTelemetry,
    ) -> Step<(Quaternion, Quaternion)> {
        let initial = telemetry
            .attitude
            .iter()
            .rev()
            .find(|q| q.time < candidate.nman.start_time)
            .ok_or(RejectReason::InsufficientTelemetry("no attitude before maneuver"))?;
        let settled = candidate.kalman_start + self.config.kalman_settle_time;
        let final_attitude = telemetry
            .attitude
            .iter()
            .find(|q| q.time > settled)
            .ok_or(RejectReason::InsufficientTelemetry("no attitude after Kalman settling"))?;
        Ok((*initial, *final_attitude))
    }

    /// Count-rate statistics from the window start to the maneuver, and from
    /// the final attitude to the window end.
    fn bias_statistics(
        &self,
        candidate: &ManeuverCandidate,
        count_times: &[f64],
        rates: &CountRates,
        final_time: f64,
    ) -> Step<(BiasStats, BiasStats)> {
        let before_stop = count_times
            .iter()
            .rposition(|&t| t < candidate.nman.start_time)
            .ok_or(RejectReason::InsufficientTelemetry("no gyro counts before maneuver"))?;
        let after_start = count_times
            .iter()
            .position(|&t| t > final_time)
            .ok_or(RejectReason::InsufficientTelemetry("no gyro counts after final attitude"))?;

        let before_rates = &rates.counts[..before_stop.min(rates.len())];
        let before = channel_stats(count_times[before_stop], before_rates)
            .ok_or(RejectReason::InsufficientTelemetry("empty bias window before maneuver"))?;
        let after_rates = rates.counts.get(after_start..).unwrap_or(&[]);
        let after = channel_stats(count_times[after_start], after_rates)
            .ok_or(RejectReason::InsufficientTelemetry("empty bias window after maneuver"))?;
        Ok((before, after))
    }

    fn integrate(
        &self,
        rates: &CountRates,
        body: &[[f64; 3]],
        begin: usize,
        end: usize,
    ) -> Integration {
        let mut rotation = Quaternion::identity(0.0);
        let mut integrated = [0.0; 3];
        let mut elapsed = 0.0;
        let mut sums = self.config.compute_batch.then(PropagationSums::zeros);

        for idx in begin..=end {
            let dt = rates.dt[idx];
            elapsed += dt;
            let step = RotationVector::new(rates.times[idx], body[idx]).scaled(dt);
            for axis in 0..3 {
                integrated[axis] += step.v[axis];
            }
            rotation = rotation.multiply(&Quaternion::from_vector(&step)).normalize();

            if let Some(sums) = sums.as_mut() {
                // current frame back to the initial frame
                let back = rotation.conjugate().to_rotation_matrix();
                sums.sumprop.scaled_add(dt, &back);
                for block in 0..3 {
                    for row in 0..3 {
                        for col in 0..3 {
                            sums.sumproprot[[row, 3 * block + col]] +=
                                back[[row, block]] * step.v[col];
                        }
                    }
                }
            }
        }

        if let Some(sums) = sums.as_mut() {
            let forward = rotation.to_rotation_matrix();
            sums.sumprop = forward.dot(&sums.sumprop);
            sums.sumproprot = forward.dot(&sums.sumproprot);
        }

        Integration {
            rotation,
            integrated_rate: RotationVector::new(elapsed, integrated),
            sums,
        }
    }

    fn acceptance(&self, record: &ManeuverRecord) -> Step<()> {
        let angle = record.rotation_angle();
        if angle < self.config.min_maneuver_angle() {
            return Err(RejectReason::AngleBelowMinimum {
                angle_deg: angle.to_degrees(),
            });
        }
        let sf_ave = self.matrices.sf_ave();
        if self.config.filter_bias_stdev {
            let limit = self.config.bias_stdev_limit();
            for channel in 0..4 {
                let before = record.bias_before.std_dev[channel] * sf_ave[channel];
                let after = record.bias_after.std_dev[channel] * sf_ave[channel];
                if !(before < limit && after < limit) {
                    return Err(RejectReason::BiasStdevExceeded { channel });
                }
            }
        }
        if self.config.filter_bias_difference {
            let limit = self.config.bias_diff_limit();
            for channel in 0..4 {
                if !((record.bias_difference.counts[channel] * sf_ave[channel]).abs() < limit) {
                    return Err(RejectReason::BiasDifferenceExceeded { channel });
                }
            }
        }
        Ok(())
    }
}

struct Integration {
    rotation: Quaternion,
    integrated_rate: RotationVector,
    sums: Option<PropagationSums>,
}

fn channel_stats(time: f64, rows: &[[f64; 4]]) -> Option<BiasStats> {
    if rows.is_empty() {
        return None;
    }
    let mut stats = BiasStats {
        time,
        ..Default::default()
    };
    for k in 0..4 {
        let channel: Vec<f64> = rows.iter().map(|row| row[k]).collect();
        stats.mean[k] = StatsHelper::mean(&channel)?;
        stats.std_dev[k] = StatsHelper::std_dev(&channel)?;
    }
    Some(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MissionClock;
    use crate::intervals::{Interval, TimeSpan};
    use approx::assert_abs_diff_eq;

    const NMAN_START: f64 = 2000.0;
    const NMAN_STOP: f64 = 2100.0;
    const KALMAN_START: f64 = 2200.0;

    struct Scenario {
        axis: [f64; 3],
        angle_deg: f64,
        /// Channel count drift (counts/sec) starting after the maneuver.
        drift_after: [f64; 4],
        last_sample: f64,
    }

    impl Default for Scenario {
        fn default() -> Self {
            Self {
                axis: [0.48, -0.6, 0.64],
                angle_deg: 10.0,
                drift_after: [0.0; 4],
                last_sample: 3301.0,
            }
        }
    }

    fn initial_attitude() -> Quaternion {
        Quaternion::new(0.0, [0.1, -0.2, 0.3, 0.9]).normalize()
    }

    fn angle_at(scenario: &Scenario, t: f64) -> f64 {
        let rate = scenario.angle_deg.to_radians() / (NMAN_STOP - NMAN_START);
        rate * (t - NMAN_START).clamp(0.0, NMAN_STOP - NMAN_START)
    }

    /// Unwrapped channel accumulators before truncation to whole counts.
    fn accumulated(scenario: &Scenario, matrices: &CalibrationMatrices, t: f64) -> [f64; 4] {
        let angle = angle_at(scenario, t);
        let rotation = scenario.axis.map(|c| c * angle);
        std::array::from_fn(|k| {
            let projection = MatrixHelper::dot3(&matrices.channel_axis(k), &rotation);
            let sf = if projection >= 0.0 {
                matrices.sf_pos[k]
            } else {
                matrices.sf_neg[k]
            };
            projection / sf + scenario.drift_after[k] * (t - NMAN_STOP).max(0.0)
        })
    }

    fn build(
        scenario: &Scenario,
        matrices: &CalibrationMatrices,
    ) -> (ManeuverCandidate, ManeuverTelemetry) {
        let times: Vec<f64> = (800..=scenario.last_sample as i64).map(|t| t as f64).collect();
        let mut telemetry = ManeuverTelemetry::default();
        for &t in &times {
            let angle = angle_at(scenario, t);
            let rotation = RotationVector::new(t, scenario.axis.map(|c| c * angle));
            telemetry
                .attitude
                .push(initial_attitude().multiply(&Quaternion::from_vector(&rotation)).with_time(t));

            let counts = accumulated(scenario, matrices, t).map(|c| (c.floor() as i64 as i16) as f64);
            telemetry.gyro_times.push(t);
            telemetry.gyro_counts.push(counts);
            telemetry.bias_times.push(t);
            telemetry.pcad_bias.push([0.0; 3]);
        }

        let candidate = ManeuverCandidate {
            nman: Interval {
                start_time: NMAN_START,
                stop_time: NMAN_STOP,
                start_index: 12,
                stop_index: 13,
            },
            before: TimeSpan::new(800.0, 1999.0),
            after: TimeSpan::new(2101.0, 3301.0),
            kalman_start: KALMAN_START,
        };
        (candidate, telemetry)
    }

    fn run(scenario: &Scenario, config: &PipelineConfig) -> ManeuverOutcome {
        let matrices = CalibrationMatrices::onboard(&MissionClock).unwrap();
        let (candidate, telemetry) = build(scenario, &matrices);
        ManeuverPropagator::new(config, &matrices)
            .process(0, &candidate, &telemetry)
            .unwrap()
    }

    #[test]
    fn exact_rates_reproduce_the_observed_attitude() {
        let scenario = Scenario::default();
        let outcome = run(&scenario, &PipelineConfig::default());
        assert_eq!(outcome.state, ManeuverState::Accepted);
        let record = outcome.accepted().unwrap();

        assert_eq!(record.initial.time, 1999.0);
        assert_eq!(record.final_attitude.time, 2501.0);
        assert_abs_diff_eq!(record.observed_rotation.time, 502.0, epsilon = 1e-12);
        assert_eq!(record.elapsed(), 502.0);
        assert_abs_diff_eq!(record.rotation_angle(), 10.0_f64.to_radians(), epsilon = 1e-9);

        let expected = scenario.axis.map(|c| c * 10.0_f64.to_radians());
        for axis in 0..3 {
            assert_abs_diff_eq!(record.integrated_rate.v[axis], expected[axis], epsilon = 1e-5);
        }
        assert_abs_diff_eq!(record.integrated_rate.time, 502.0, epsilon = 1e-9);
        assert!(record.residual_vector.angle() < 1e-5);
        assert!(record.residual_yz <= record.residual_vector.angle());

        let matrices = CalibrationMatrices::onboard(&MissionClock).unwrap();
        assert_eq!(record.sign_code, sign_code(&matrices, &expected));
        assert!(record.sums.is_some());
    }

    #[test]
    fn count_difference_spans_the_maneuver() {
        let scenario = Scenario::default();
        let outcome = run(&scenario, &PipelineConfig::default());
        let record = outcome.record.unwrap();
        let matrices = CalibrationMatrices::onboard(&MissionClock).unwrap();
        let start = accumulated(&scenario, &matrices, 1999.0);
        let stop = accumulated(&scenario, &matrices, 2501.0);
        for k in 0..4 {
            let expected = (stop[k].floor() - start[k].floor()) as i64;
            assert_eq!(record.count_difference[k], expected);
        }
        assert!(record.count_difference.iter().all(|&c| c < -100_000));
    }

    #[test]
    fn small_rotation_is_rejected_after_propagation() {
        let scenario = Scenario {
            angle_deg: 2.0,
            ..Default::default()
        };
        let outcome = run(&scenario, &PipelineConfig::default());
        assert!(matches!(
            outcome.state,
            ManeuverState::Rejected(RejectReason::AngleBelowMinimum { .. })
        ));
        assert!(outcome.record.is_some());
        assert!(outcome.accepted().is_none());
    }

    #[test]
    fn missing_settled_attitude_rejects_without_record() {
        let scenario = Scenario {
            last_sample: 2450.0,
            ..Default::default()
        };
        let outcome = run(&scenario, &PipelineConfig::default());
        assert!(matches!(
            outcome.state,
            ManeuverState::Rejected(RejectReason::InsufficientTelemetry(_))
        ));
        assert!(outcome.record.is_none());
    }

    #[test]
    fn bias_shift_across_maneuver_is_rejected() {
        let scenario = Scenario {
            drift_after: [5.0, 0.0, 0.0, 0.0],
            ..Default::default()
        };
        let outcome = run(&scenario, &PipelineConfig::default());
        assert_eq!(
            outcome.state,
            ManeuverState::Rejected(RejectReason::BiasDifferenceExceeded { channel: 0 })
        );
        let record = outcome.record.unwrap();
        assert_abs_diff_eq!(record.bias_difference.counts[0], -5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(record.bias_after.mean[0], 5.0, epsilon = 1e-9);

        let lenient = PipelineConfig {
            filter_bias_difference: false,
            ..Default::default()
        };
        assert_eq!(run(&scenario, &lenient).state, ManeuverState::Accepted);
    }

    #[test]
    fn stationary_sums_accumulate_elapsed_time() {
        let scenario = Scenario {
            angle_deg: 0.0,
            ..Default::default()
        };
        let outcome = run(&scenario, &PipelineConfig::default());
        let sums = outcome.record.unwrap().sums.unwrap();
        assert_abs_diff_eq!(sums.sumprop[[0, 0]], 502.0, epsilon = 1e-9);
        assert_abs_diff_eq!(sums.sumprop[[1, 1]], 502.0, epsilon = 1e-9);
        assert_abs_diff_eq!(sums.sumprop[[0, 1]], 0.0, epsilon = 1e-12);
        assert!(sums.sumproprot.iter().all(|v| v.abs() < 1e-12));

        let no_batch = PipelineConfig {
            compute_batch: false,
            ..Default::default()
        };
        assert!(run(&scenario, &no_batch).record.unwrap().sums.is_none());
    }
}
