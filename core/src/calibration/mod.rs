pub mod matrices;
pub mod rates;
pub mod signs;

pub use matrices::{CalibrationMatrices, MmatEpoch};
pub use rates::{
    align_rate_timing, resolve_rollover, CalibratedRates, CountRates, RateCalibrator,
    RolloverCounts,
};
pub use signs::{sign_code, sign_code_from_projections, sign_pattern, SignHistogram};
