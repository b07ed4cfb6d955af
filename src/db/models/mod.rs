pub mod ride;

pub use ride::{average_speed_kmh, NewRide, Ride};
