//! Telemetry channel names used by the calibration and pointing workflows.

/// PCAD mode flag (NPNT, NMAN, ...).
pub const PCAD_MODE: &str = "AOPCADMD";
/// Autonomous mode transition flag (DISA marks a segmented maneuver).
pub const AUTO_TRANSITION: &str = "AOAUTTXN";
/// Aspect camera processing sequence (KALM when the Kalman filter runs).
pub const ACA_SEQUENCE: &str = "AOACASEQ";
/// Momentum unloading state (GRND for ground-commanded dumps).
pub const UNLOAD_STATE: &str = "AOUNLOAD";
/// Reaction wheel bias enable (DISA after safing actions).
pub const RW_BIAS: &str = "AORWBIAS";

pub const ATTITUDE: [&str; 4] = ["AOATTQT1", "AOATTQT2", "AOATTQT3", "AOATTQT4"];
pub const GYRO_COUNTS: [&str; 4] = ["AOGYRCT1", "AOGYRCT2", "AOGYRCT3", "AOGYRCT4"];
pub const GYRO_BIAS: [&str; 3] = ["AOGBIAS1", "AOGBIAS2", "AOGBIAS3"];
pub const ATTITUDE_ERROR: [&str; 3] = ["AOATTER1", "AOATTER2", "AOATTER3"];

/// Spacecraft velocity (m/sec).
pub const ORBIT_VELOCITY: [&str; 3] = ["orbitephem1_vx", "orbitephem1_vy", "orbitephem1_vz"];
/// Solar velocity in the same frame (m/sec).
pub const SOLAR_VELOCITY: [&str; 3] = ["solarephem1_vx", "solarephem1_vy", "solarephem1_vz"];

pub const MODE_CHANNELS: [&str; 5] = [PCAD_MODE, AUTO_TRANSITION, ACA_SEQUENCE, UNLOAD_STATE, RW_BIAS];

pub const NPNT: &str = "NPNT";
pub const NMAN: &str = "NMAN";
pub const KALM: &str = "KALM";
pub const DISA: &str = "DISA";
pub const GRND: &str = "GRND";
