use serde::{Deserialize, Serialize};

/// Degrees/hour expressed in radians/second.
pub const DPH_TO_RPS: f64 = std::f64::consts::PI / 180.0 / 3600.0;

/// Thresholds and option flags for one calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum duration of the pointing interval before and after a maneuver (sec).
    pub npnt_min_duration: f64,
    /// Time after Kalman convergence before the final attitude is trusted (sec).
    pub kalman_settle_time: f64,
    /// Extension applied to the end of each ground momentum dump (sec).
    pub dump_damping: f64,
    pub min_maneuver_angle_deg: f64,
    pub bias_diff_limit_dph: f64,
    pub bias_stdev_limit_dph: f64,
    pub filter_bias_stdev: bool,
    pub filter_bias_difference: bool,
    /// Remove the averaged channel count bias instead of the on-board 3-axis bias.
    pub use_average_bias: bool,
    pub apply_onboard_mmat: bool,
    pub adjust_aberration: bool,
    /// Padding of the ephemeris fetch around each maneuver window (sec).
    pub ephemeris_pad: f64,
    pub compute_batch: bool,
    pub write_signs: bool,
    /// Correction applied on top of the on-board M matrix.
    pub dmat: [[f64; 3]; 3],
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            npnt_min_duration: 1200.0,
            kalman_settle_time: 300.0,
            dump_damping: 180.0,
            min_maneuver_angle_deg: 5.0,
            bias_diff_limit_dph: 0.025,
            bias_stdev_limit_dph: 0.080,
            filter_bias_stdev: false,
            filter_bias_difference: true,
            use_average_bias: false,
            apply_onboard_mmat: false,
            adjust_aberration: false,
            ephemeris_pad: 600.0,
            compute_batch: true,
            write_signs: false,
            dmat: [[0.0; 3]; 3],
        }
    }
}

impl PipelineConfig {
    pub fn min_maneuver_angle(&self) -> f64 {
        self.min_maneuver_angle_deg.to_radians()
    }

    pub fn bias_diff_limit(&self) -> f64 {
        self.bias_diff_limit_dph * DPH_TO_RPS
    }

    pub fn bias_stdev_limit(&self) -> f64 {
        self.bias_stdev_limit_dph * DPH_TO_RPS
    }
}

/// Common error type for the calibration core.
#[derive(thiserror::Error, Debug)]
pub enum CalError {
    #[error("structural inconsistency in {check}: {detail}")]
    StructuralInconsistency { check: String, detail: String },
    #[error("channel {0} not available from telemetry source")]
    MissingChannel(String),
    #[error("channel {channel} does not hold {expected} values")]
    ChannelKind {
        channel: String,
        expected: &'static str,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("bad date string: {0}")]
    TimeFormat(String),
    #[error("parse failure on line {line}: {detail}")]
    Parse { line: usize, detail: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CalError {
    pub fn structural(check: impl Into<String>, detail: impl Into<String>) -> Self {
        CalError::StructuralInconsistency {
            check: check.into(),
            detail: detail.into(),
        }
    }
}

pub type CalResult<T> = Result<T, CalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_convert_to_radians() {
        let config = PipelineConfig::default();
        assert!((config.min_maneuver_angle() - 5.0_f64.to_radians()).abs() < 1e-15);
        assert!((config.bias_diff_limit() - 0.025 * DPH_TO_RPS).abs() < 1e-20);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"npnt_min_duration": 600.0, "write_signs": true}"#).unwrap();
        assert_eq!(config.npnt_min_duration, 600.0);
        assert!(config.write_signs);
        assert_eq!(config.kalman_settle_time, 300.0);
    }

    #[test]
    fn structural_error_names_the_check() {
        let err = CalError::structural("NPNT intervals", "3 starts vs 2 stops");
        assert_eq!(
            err.to_string(),
            "structural inconsistency in NPNT intervals: 3 starts vs 2 stops"
        );
    }
}
