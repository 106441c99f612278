pub mod extract;
pub mod overlap;

pub use extract::{extract_intervals, Interval};
pub use overlap::{exclude_overlapping, overlaps, OverlapRule, TimeSpan};
