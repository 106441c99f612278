pub mod catalog;
pub mod format;
pub mod summary;
pub mod table;

pub use catalog::ProcessingWindow;
pub use summary::RunSummary;
pub use table::{write_pointing_table, TableLayout};
