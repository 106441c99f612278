//! Gyro calibration core for an inertial reference unit.
//!
//! Mode telemetry is reduced to state intervals, maneuvers with clean
//! pointing on either side are selected, and the calibrated gyro rates are
//! propagated across each maneuver for comparison with the attitude
//! solution. A second analysis characterizes attitude error during stable
//! pointing.

pub mod archive;
pub mod calibration;
pub mod clock;
pub mod diagnostics;
pub mod intervals;
pub mod math;
pub mod pipeline;
pub mod pointing;
pub mod prelude;
pub mod propagation;
pub mod report;
pub mod selection;

pub use pipeline::{CalibrationPipeline, RunOutput};
pub use prelude::{CalError, CalResult, PipelineConfig};
