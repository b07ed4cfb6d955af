pub mod format;
pub mod logging;

pub use format::{format_clock, format_total_duration};
pub use logging::init_logging;
