//! Summary cards and chart series derived from the ride collection.
//!
//! Everything here is recomputed from the current collection on each call;
//! nothing is cached or persisted.

mod series;
mod summary;

pub use series::{compute_series, today_in, ChartPoint, ChartSeries, Period};
pub use summary::{compute_summary, RideStats};
