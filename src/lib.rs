//! Ride recording and statistics engine.
//!
//! A [`recorder::RideRecorder`] turns a live stream of position fixes into a
//! finished ride, [`rides::RideRepository`] keeps completed rides newest first
//! in a key-value store, and [`stats`] and [`leaderboard`] derive what the
//! profile and battle screens show.

mod utils;

pub mod app;
pub mod db;
pub mod error;
pub mod geo;
pub mod leaderboard;
pub mod paths;
pub mod recorder;
pub mod rides;
pub mod settings;
pub mod stats;

pub use app::{LeaderboardView, Report, RideBattle, StoppedRide};
pub use error::RideError;
pub use utils::{format_clock, format_total_duration, init_logging};
