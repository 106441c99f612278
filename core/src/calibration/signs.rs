use crate::calibration::matrices::CalibrationMatrices;
use crate::math::MatrixHelper;

const BIT_WEIGHTS: [u8; 4] = [1, 2, 4, 8];

/// Packs the sign of each channel projection into a 4-bit code; channel `k`
/// contributes `2^k` when its projection is non-negative.
pub fn sign_code_from_projections(projections: [f64; 4]) -> u8 {
    projections
        .iter()
        .zip(BIT_WEIGHTS)
        .filter(|(p, _)| **p >= 0.0)
        .map(|(_, weight)| weight)
        .sum()
}

/// Sign code of a rotation vector against the channel axes.
pub fn sign_code(matrices: &CalibrationMatrices, rotation: &[f64; 3]) -> u8 {
    let projections = std::array::from_fn(|k| MatrixHelper::dot3(&matrices.channel_axis(k), rotation));
    sign_code_from_projections(projections)
}

/// Sign pattern written highest channel first, e.g. code 1 -> `---+`.
pub fn sign_pattern(code: u8) -> String {
    (0..4)
        .rev()
        .map(|bit| if code & (1 << bit) != 0 { '+' } else { '-' })
        .collect()
}

/// Count of accepted maneuvers per sign code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignHistogram {
    counts: [usize; 16],
}

impl SignHistogram {
    pub fn from_codes(codes: impl IntoIterator<Item = u8>) -> Self {
        let mut histogram = Self::default();
        for code in codes {
            histogram.counts[usize::from(code & 0x0f)] += 1;
        }
        histogram
    }

    pub fn count(&self, code: u8) -> usize {
        self.counts[usize::from(code & 0x0f)]
    }

    /// Two-column table pairing each code with its complement.
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![" code signs num  code signs num".to_string()];
        for code in 0u8..8 {
            let complement = 15 - code;
            lines.push(format!(
                "  {:2}  {}  {:2}    {:2}  {}  {:2}",
                code,
                sign_pattern(code),
                self.count(code),
                complement,
                sign_pattern(complement),
                self.count(complement)
            ));
        }
        lines
    }
}
