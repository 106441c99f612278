pub mod propagator;
pub mod record;
pub mod telemetry;

pub use propagator::ManeuverPropagator;
pub use record::{
    BiasStats, ChannelBias, ManeuverOutcome, ManeuverRecord, ManeuverState, PropagationSums,
    RejectReason,
};
pub use telemetry::{ManeuverTelemetry, RelativeVelocity};
