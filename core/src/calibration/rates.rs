use crate::calibration::matrices::CalibrationMatrices;
use crate::math::MatrixHelper;
use crate::prelude::{CalError, CalResult};
use ndarray::{Array2, ArrayView2};

/// Per-channel count rate between successive gyro samples. Entry `i` covers
/// the step ending at `times[i]`, which lasted `dt[i]` seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountRates {
    pub times: Vec<f64>,
    pub dt: Vec<f64>,
    pub counts: Vec<[f64; 4]>,
}

impl CountRates {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Gyro accumulators with the 16-bit wraparound removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RolloverCounts {
    pub times: Vec<f64>,
    /// Accumulated counts re-summed from zero at the first sample.
    pub adjusted: Vec<[f64; 4]>,
    /// Signed count change into each sample; zero at the first.
    pub deltas: Vec<[f64; 4]>,
    pub rates: CountRates,
}

fn wrapped_delta(previous: f64, current: f64) -> f64 {
    ((current - previous).round() as i64 as i16) as f64
}

/// Differences the raw accumulators through a signed 16-bit wrap so a
/// counter crossing +32767 -> -32768 yields a small delta.
pub fn resolve_rollover(times: &[f64], raw: &[[f64; 4]]) -> CalResult<RolloverCounts> {
    if times.len() != raw.len() {
        return Err(CalError::structural(
            "gyro counts",
            format!("{} count samples for {} times", raw.len(), times.len()),
        ));
    }
    let n = times.len();
    let mut deltas = vec![[0.0; 4]; n];
    let mut adjusted = vec![[0.0; 4]; n];
    let mut rates = CountRates::default();

    for i in 1..n {
        let mut rate = [0.0; 4];
        let dt = times[i] - times[i - 1];
        for k in 0..4 {
            deltas[i][k] = wrapped_delta(raw[i - 1][k], raw[i][k]);
            adjusted[i][k] = adjusted[i - 1][k] + deltas[i][k];
            if dt > 0.0 {
                rate[k] = deltas[i][k] / dt;
            }
        }
        rates.times.push(times[i]);
        rates.dt.push(dt);
        rates.counts.push(rate);
    }

    Ok(RolloverCounts {
        times: times.to_vec(),
        adjusted,
        deltas,
        rates,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibratedRates {
    /// Bias-removed, scaled channel rates (rad/sec).
    pub channel: Vec<[f64; 4]>,
    /// Body rates (rad/sec).
    pub body: Vec<[f64; 3]>,
}

/// Channel count rates to body rates through `(I+D)(I+M)G`.
pub struct RateCalibrator {
    mapping: Array2<f64>,
    sf_pos: [f64; 4],
    sf_neg: [f64; 4],
}

impl RateCalibrator {
    pub fn new(
        matrices: &CalibrationMatrices,
        dmat: ArrayView2<f64>,
        mmat: ArrayView2<f64>,
    ) -> Self {
        Self {
            mapping: MatrixHelper::corrected_mapping(dmat, mmat, matrices.gmat.view()),
            sf_pos: matrices.sf_pos,
            sf_neg: matrices.sf_neg,
        }
    }

    /// `bias4` is removed from the count rates (counts/sec), `bias3` from
    /// the body rates (rad/sec).
    pub fn calibrate(
        &self,
        rate_counts: &[[f64; 4]],
        bias4: [f64; 4],
        bias3: [f64; 3],
    ) -> CalibratedRates {
        let channel: Vec<[f64; 4]> = rate_counts
            .iter()
            .map(|row| {
                std::array::from_fn(|k| {
                    let counts = row[k] - bias4[k];
                    if counts > 0.0 {
                        counts * self.sf_pos[k]
                    } else if counts < 0.0 {
                        counts * self.sf_neg[k]
                    } else {
                        0.0
                    }
                })
            })
            .collect();

        let columns = Array2::from_shape_fn((4, channel.len()), |(k, i)| channel[i][k]);
        let body_columns = MatrixHelper::multiply(self.mapping.view(), columns.view());
        let body = (0..channel.len())
            .map(|i| std::array::from_fn(|axis| body_columns[[axis, i]] - bias3[axis]))
            .collect();

        CalibratedRates { channel, body }
    }
}

/// Shifts each body rate a quarter step toward the following sample to
/// line the rate up with the telemetry time tag. The last sample is kept.
pub fn align_rate_timing(body: &mut [[f64; 3]]) {
    for i in 0..body.len().saturating_sub(1) {
        let next = body[i + 1];
        for axis in 0..3 {
            body[i][axis] = 0.75 * body[i][axis] + 0.25 * next[axis];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MissionClock;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rollover_deltas_stay_small_across_the_wrap() {
        let times = [0.0, 0.25, 0.5, 0.75];
        let raw: Vec<[f64; 4]> = [32760.0, 32766.0, -32766.0, -32760.0]
            .iter()
            .map(|&c| [c, -c, 0.0, c])
            .collect();
        let counts = resolve_rollover(&times, &raw).unwrap();

        let ch0: Vec<f64> = counts.deltas.iter().map(|d| d[0]).collect();
        assert_eq!(ch0, vec![0.0, 6.0, 4.0, 6.0]);
        let ch1: Vec<f64> = counts.deltas.iter().map(|d| d[1]).collect();
        assert_eq!(ch1, vec![0.0, -6.0, -4.0, -6.0]);
        assert!(counts.deltas.iter().flatten().all(|d| d.abs() <= 10.0));

        assert_eq!(counts.adjusted[3][0], 16.0);
        assert_eq!(counts.rates.len(), 3);
        assert_eq!(counts.rates.times, vec![0.25, 0.5, 0.75]);
        assert_eq!(counts.rates.counts[1][0], 16.0);
    }

    #[test]
    fn repeated_timestamp_gives_zero_rate() {
        let counts = resolve_rollover(&[0.0, 0.0, 1.0], &[[0.0; 4], [5.0; 4], [7.0; 4]]).unwrap();
        assert_eq!(counts.rates.counts[0], [0.0; 4]);
        assert_eq!(counts.rates.counts[1], [2.0; 4]);
        assert_eq!(counts.adjusted[2], [7.0; 4]);
    }

    #[test]
    fn mismatched_lengths_are_structural() {
        assert!(matches!(
            resolve_rollover(&[0.0, 1.0], &[[0.0; 4]]),
            Err(CalError::StructuralInconsistency { .. })
        ));
    }

    #[test]
    fn scale_factor_follows_count_sign() {
        let matrices = CalibrationMatrices::onboard(&MissionClock).unwrap();
        let zero = Array2::<f64>::zeros((3, 3));
        let calibrator = RateCalibrator::new(&matrices, zero.view(), zero.view());
        let rates = calibrator.calibrate(&[[10.0, -10.0, 3.0, 0.0]], [0.0, 0.0, 3.0, 0.0], [0.0; 3]);
        let channel = rates.channel[0];
        assert_abs_diff_eq!(channel[0], 10.0 * matrices.sf_pos[0], epsilon = 1e-20);
        assert_abs_diff_eq!(channel[1], -10.0 * matrices.sf_neg[1], epsilon = 1e-20);
        assert_eq!(channel[2], 0.0);
        assert_eq!(channel[3], 0.0);
    }

    #[test]
    fn channel_projection_recovers_body_rate() {
        let matrices = CalibrationMatrices::onboard(&MissionClock).unwrap();
        let zero = Array2::<f64>::zeros((3, 3));
        let calibrator = RateCalibrator::new(&matrices, zero.view(), zero.view());
        let omega = [1.0e-3, -2.0e-3, 0.5e-3];
        let bias3 = [1.0e-7, 0.0, -1.0e-7];
        let counts: [f64; 4] = std::array::from_fn(|k| {
            let rate = MatrixHelper::dot3(&matrices.channel_axis(k), &omega);
            if rate >= 0.0 {
                rate / matrices.sf_pos[k]
            } else {
                rate / matrices.sf_neg[k]
            }
        });
        let body = calibrator.calibrate(&[counts], [0.0; 4], bias3).body[0];
        for axis in 0..3 {
            assert_abs_diff_eq!(body[axis], omega[axis] - bias3[axis], epsilon = 1e-12);
        }
    }

    #[test]
    fn timing_alignment_blends_forward() {
        let mut body = vec![[0.0, 4.0, 8.0], [4.0, 4.0, 0.0], [8.0, 8.0, 8.0]];
        align_rate_timing(&mut body);
        assert_eq!(body[0], [1.0, 4.0, 6.0]);
        assert_eq!(body[1], [5.0, 5.0, 2.0]);
        assert_eq!(body[2], [8.0, 8.0, 8.0]);
        let mut empty: Vec<[f64; 3]> = Vec::new();
        align_rate_timing(&mut empty);
    }
}
