pub mod channels;
pub mod series;
pub mod source;

pub use series::{ChannelSeries, ChannelValues, TelemetrySet};
pub use source::{MemoryArchive, TelemetrySource};
