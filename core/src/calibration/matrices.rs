use crate::clock::DateConverter;
use crate::math::MatrixHelper;
use crate::prelude::CalResult;
use ndarray::{array, Array2};

/// Conversion from the raw low-rate count scale (rad/count) applied to every
/// per-channel scale factor.
const LOW_RATE_SCALE: f64 = 0.25625 / 4.0;

const SF_POS_RAW: [f64; 4] = [0.1555267e-05, 0.1564191e-05, 0.1552225e-05, 0.1569751e-05];
const SF_NEG_RAW: [f64; 4] = [0.1555571e-05, 0.1564383e-05, 0.1552371e-05, 0.1570025e-05];

/// Uplink instants of the on-board M matrices.
const MMAT_EPOCHS: [&str; 6] = [
    "2003:203:00:00:00.000",
    "2003:274:13:19:00.000",
    "2006:352:14:25:00.000",
    "2010:350:22:10:00.000",
    "2011:105:21:20:00.000",
    "2012:062:15:26:00.000",
];

const MMAT_TABLE: [[[f64; 3]; 3]; 6] = [
    [[0.0; 3]; 3],
    [
        [3.3203451e-06, 9.3199606e-05, 1.3764573e-05],
        [-1.3894030e-04, -1.3754384e-05, 9.8274797e-06],
        [-3.8983014e-05, 4.5790156e-06, 3.3727364e-06],
    ],
    [
        [0.392656e-4, 0.920426e-4, 0.047589e-4],
        [-1.509408e-4, 0.429630e-4, 0.155405e-4],
        [-0.477453e-4, 0.168878e-4, 0.679124e-4],
    ],
    [
        [8.792448e-05, 1.409469e-04, 3.321078e-05],
        [-1.200405e-04, 9.856613e-05, 2.051482e-05],
        [-3.014042e-05, 2.017329e-05, 1.311966e-04],
    ],
    [
        [1.651433e-04, 1.888956e-04, 6.763121e-05],
        [-5.143320e-05, 1.669320e-04, 2.689127e-05],
        [-2.455693e-06, 1.191769e-05, 2.150693e-04],
    ],
    [
        [2.484911e-04, 1.933052e-04, 5.790450e-05],
        [2.882515e-05, 2.505313e-04, 4.593649e-05],
        [4.250966e-05, 8.943458e-06, 2.930867e-04],
    ],
];

/// M matrix in force from `start` onward.
#[derive(Debug, Clone)]
pub struct MmatEpoch {
    pub start: f64,
    pub matrix: Array2<f64>,
}

/// On-board gyro calibration, read-only for a whole run.
#[derive(Debug, Clone)]
pub struct CalibrationMatrices {
    /// Channel-to-body pseudo-inverse (3x4).
    pub gmat: Array2<f64>,
    /// Sensitive axis of each channel, one row per channel (4x3).
    pub umat: Array2<f64>,
    pub sf_pos: [f64; 4],
    pub sf_neg: [f64; 4],
    pub mmat_epochs: Vec<MmatEpoch>,
}

impl CalibrationMatrices {
    pub fn onboard(clock: &impl DateConverter) -> CalResult<Self> {
        let mmat_epochs = MMAT_EPOCHS
            .iter()
            .zip(MMAT_TABLE.iter())
            .map(|(date, rows)| {
                Ok(MmatEpoch {
                    start: clock.to_secs(date)?,
                    matrix: MatrixHelper::from_rows3(rows),
                })
            })
            .collect::<CalResult<Vec<_>>>()?;

        Ok(Self {
            gmat: array![
                [-0.499539493, 0.500015266, 0.500455729, -0.500504173],
                [-0.254059137, 0.609733116, -0.253191860, 0.610258254],
                [-0.557983976, -0.053139506, -0.556465488, -0.053843139]
            ],
            umat: array![
                [-0.498768681599350, -0.076240169039052, -0.863375491725958],
                [0.500265748681156, 0.788096859372320, -0.358660734576184],
                [0.500711245008005, -0.075089767304433, -0.862351305901781],
                [-0.499738137314404, 0.788337746634606, -0.358866815375450]
            ],
            sf_pos: SF_POS_RAW.map(|sf| sf * LOW_RATE_SCALE),
            sf_neg: SF_NEG_RAW.map(|sf| sf * LOW_RATE_SCALE),
            mmat_epochs,
        })
    }

    /// Mean of the positive and negative scale factors, per channel.
    pub fn sf_ave(&self) -> [f64; 4] {
        std::array::from_fn(|k| (self.sf_pos[k] + self.sf_neg[k]) / 2.0)
    }

    /// The M matrix uplinked most recently before `time`; zero before the
    /// first epoch.
    pub fn mmat_at(&self, time: f64) -> Array2<f64> {
        self.mmat_epochs
            .iter()
            .rev()
            .find(|epoch| time >= epoch.start)
            .map(|epoch| epoch.matrix.clone())
            .unwrap_or_else(|| Array2::zeros((3, 3)))
    }

    /// Row `k` of the channel axis matrix.
    pub fn channel_axis(&self, k: usize) -> [f64; 3] {
        [self.umat[[k, 0]], self.umat[[k, 1]], self.umat[[k, 2]]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MissionClock;
    use approx::assert_abs_diff_eq;

    fn matrices() -> CalibrationMatrices {
        CalibrationMatrices::onboard(&MissionClock).unwrap()
    }

    #[test]
    fn gmat_inverts_umat() {
        let cal = matrices();
        let product = cal.gmat.dot(&cal.umat);
        let eye = Array2::<f64>::eye(3);
        for r in 0..3 {
            for c in 0..3 {
                assert_abs_diff_eq!(product[[r, c]], eye[[r, c]], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn scale_factors_are_positive_and_averaged() {
        let cal = matrices();
        let ave = cal.sf_ave();
        assert_abs_diff_eq!(cal.sf_pos[0], 0.1555267e-05 * 0.25625 / 4.0, epsilon = 1e-20);
        assert!(cal.sf_neg.iter().all(|&sf| sf > 0.0));
        assert_abs_diff_eq!(ave[3], (cal.sf_pos[3] + cal.sf_neg[3]) / 2.0, epsilon = 1e-20);
    }

    #[test]
    fn mmat_lookup_brackets_epochs() {
        let cal = matrices();
        let clock = MissionClock;
        let before = clock.to_secs("2003:100").unwrap();
        assert!(cal.mmat_at(before).iter().all(|&v| v == 0.0));

        // between the IRU swap and the first uplink the matrix is still zero
        let first = clock.to_secs("2003:250").unwrap();
        assert!(cal.mmat_at(first).iter().all(|&v| v == 0.0));

        let at_uplink = clock.to_secs("2006:352:14:25:00.000").unwrap();
        assert_abs_diff_eq!(cal.mmat_at(at_uplink)[[0, 0]], 0.392656e-4, epsilon = 1e-15);
        assert_abs_diff_eq!(cal.mmat_at(at_uplink - 1.0)[[0, 0]], 3.3203451e-06, epsilon = 1e-15);

        let latest = clock.to_secs("2013:001").unwrap();
        assert_abs_diff_eq!(cal.mmat_at(latest)[[2, 2]], 2.930867e-04, epsilon = 1e-15);
    }
}
