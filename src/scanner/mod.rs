pub mod batch_runner;
pub mod file_filter;

pub use batch_runner::{BatchOutcome, BatchRunner};
pub use file_filter::FileFilter;
