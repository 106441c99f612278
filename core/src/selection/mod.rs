pub mod modes;
pub mod selector;

pub use modes::{load_bad_times, parse_bad_times, ModeIntervals};
pub use selector::{ManeuverCandidate, ManeuverSelector, Selection, SelectionStats};
