//! Completed ride records as stored in the ride collection blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Average speed in km/h, `0.0` when no time elapsed.
pub fn average_speed_kmh(distance_km: f64, duration_secs: u64) -> f64 {
    if duration_secs == 0 {
        return 0.0;
    }
    distance_km / (duration_secs as f64 / 3600.0)
}

/// A finished ride that has not been given an identifier yet.
///
/// Produced by the recorder on stop and handed to the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRide {
    pub date: DateTime<Utc>,
    pub duration_sec: u64,
    pub distance_km: f64,
    pub avg_speed_kmh: f64,
}

impl NewRide {
    /// Builds a ride, deriving the stored average speed.
    pub fn new(date: DateTime<Utc>, duration_sec: u64, distance_km: f64) -> Self {
        Self {
            date,
            duration_sec,
            distance_km,
            avg_speed_kmh: average_speed_kmh(distance_km, duration_sec),
        }
    }

    pub fn with_id(self, id: String) -> Ride {
        Ride {
            id,
            date: self.date,
            duration_sec: self.duration_sec,
            distance_km: self.distance_km,
            avg_speed_kmh: self.avg_speed_kmh,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: String,
    pub date: DateTime<Utc>,
    pub duration_sec: u64,
    pub distance_km: f64,
    pub avg_speed_kmh: f64,
}
