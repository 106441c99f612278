use crate::intervals::Interval;
use crate::math::{Quaternion, RotationVector};
use ndarray::Array2;
use serde::Serialize;
use std::fmt;

/// Lifecycle of one maneuver through the propagator.
#[derive(Debug, Clone, PartialEq)]
pub enum ManeuverState {
    Candidate,
    IntervalsResolved,
    RatesCalibrated,
    AttitudePropagated,
    Accepted,
    Rejected(RejectReason),
}

impl ManeuverState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ManeuverState::Accepted | ManeuverState::Rejected(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    InsufficientTelemetry(&'static str),
    AngleBelowMinimum { angle_deg: f64 },
    BiasStdevExceeded { channel: usize },
    BiasDifferenceExceeded { channel: usize },
}

impl RejectReason {
    /// Short key used for rejection counters.
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::InsufficientTelemetry(_) => "insufficient telemetry",
            RejectReason::AngleBelowMinimum { .. } => "angle below minimum",
            RejectReason::BiasStdevExceeded { .. } => "bias stdev over limit",
            RejectReason::BiasDifferenceExceeded { .. } => "bias difference over limit",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InsufficientTelemetry(what) => write!(f, "insufficient telemetry: {}", what),
            RejectReason::AngleBelowMinimum { angle_deg } => {
                write!(f, "rotation angle {:.3} deg below minimum", angle_deg)
            }
            RejectReason::BiasStdevExceeded { channel } => {
                write!(f, "channel {} bias standard deviation over limit", channel + 1)
            }
            RejectReason::BiasDifferenceExceeded { channel } => {
                write!(f, "channel {} bias change across maneuver over limit", channel + 1)
            }
        }
    }
}

/// Channel count-rate statistics over a quiet pointing stretch (counts/sec).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BiasStats {
    pub time: f64,
    pub mean: [f64; 4],
    pub std_dev: [f64; 4],
}

/// Four-channel count-rate bias tagged with a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelBias {
    pub time: f64,
    pub counts: [f64; 4],
}

impl ChannelBias {
    pub fn average(before: &BiasStats, after: &BiasStats) -> Self {
        Self {
            time: (before.time + after.time) / 2.0,
            counts: std::array::from_fn(|k| (before.mean[k] + after.mean[k]) / 2.0),
        }
    }

    /// Before minus after. The time is the before/after midpoint, shared with
    /// the average bias.
    pub fn difference(before: &BiasStats, after: &BiasStats) -> Self {
        Self {
            time: (before.time + after.time) / 2.0,
            counts: std::array::from_fn(|k| before.mean[k] - after.mean[k]),
        }
    }
}

/// Batch partials of the propagated attitude with respect to a constant
/// rate bias (`sumprop`, 3x3) and a rate-proportional error (`sumproprot`, 3x9).
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationSums {
    pub sumprop: Array2<f64>,
    pub sumproprot: Array2<f64>,
}

impl PropagationSums {
    pub fn zeros() -> Self {
        Self {
            sumprop: Array2::zeros((3, 3)),
            sumproprot: Array2::zeros((3, 9)),
        }
    }
}

/// Everything computed for one propagated maneuver.
#[derive(Debug, Clone)]
pub struct ManeuverRecord {
    pub nman: Interval,
    pub initial: Quaternion,
    pub final_attitude: Quaternion,
    /// Propagated rotation from the initial attitude.
    pub maneuver_rotation: Quaternion,
    /// Integrated body rate; the time is the integration span.
    pub integrated_rate: RotationVector,
    pub count_difference: [i64; 4],
    /// Observed rotation from initial to final; the time is the elapsed time.
    pub observed_rotation: Quaternion,
    pub observed_vector: RotationVector,
    pub propagated_final: Quaternion,
    pub residual: Quaternion,
    pub residual_vector: RotationVector,
    pub residual_yz: f64,
    pub sums: Option<PropagationSums>,
    pub pcad_bias_time: f64,
    pub pcad_bias: [f64; 3],
    pub bias_before: BiasStats,
    pub bias_after: BiasStats,
    pub average_bias: ChannelBias,
    pub bias_difference: ChannelBias,
    pub sign_code: u8,
}

impl ManeuverRecord {
    pub fn rotation_angle(&self) -> f64 {
        self.observed_vector.angle()
    }

    pub fn elapsed(&self) -> f64 {
        self.final_attitude.time - self.initial.time
    }
}

/// Terminal result for one candidate. Candidates rejected before propagation
/// carry no record.
#[derive(Debug, Clone)]
pub struct ManeuverOutcome {
    pub nman: Interval,
    pub state: ManeuverState,
    pub record: Option<ManeuverRecord>,
}

impl ManeuverOutcome {
    pub fn accepted(&self) -> Option<&ManeuverRecord> {
        match self.state {
            ManeuverState::Accepted => self.record.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bias_difference_shares_the_average_time() {
        let before = BiasStats {
            time: 100.0,
            mean: [1.0, 2.0, 3.0, 4.0],
            std_dev: [0.0; 4],
        };
        let after = BiasStats {
            time: 300.0,
            mean: [0.5, 2.0, 4.0, 4.0],
            std_dev: [0.0; 4],
        };
        let average = ChannelBias::average(&before, &after);
        let difference = ChannelBias::difference(&before, &after);
        assert_eq!(average.time, 200.0);
        assert_eq!(difference.time, average.time);
        assert_eq!(average.counts, [0.75, 2.0, 3.5, 4.0]);
        assert_eq!(difference.counts, [0.5, 0.0, -1.0, 0.0]);
    }

    #[test]
    fn reasons_render_for_logs() {
        let reason = RejectReason::BiasDifferenceExceeded { channel: 2 };
        assert_eq!(reason.to_string(), "channel 3 bias change across maneuver over limit");
        assert_eq!(reason.label(), "bias difference over limit");
        assert!(ManeuverState::Rejected(reason).is_terminal());
        assert!(!ManeuverState::RatesCalibrated.is_terminal());
    }
}
