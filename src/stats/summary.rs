use serde::{Deserialize, Serialize};

use crate::db::{average_speed_kmh, Ride};

/// Totals and records across the whole ride collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideStats {
    pub total_distance_km: f64,
    pub total_duration_sec: u64,
    pub rides_count: usize,
    pub avg_speed_kmh: f64,
    pub max_distance_km: f64,
    pub max_speed_kmh: f64,
}

/// Aggregates the collection. An empty collection gives all zeros.
pub fn compute_summary(rides: &[Ride]) -> RideStats {
    if rides.is_empty() {
        return RideStats::default();
    }

    let total_distance_km: f64 = rides.iter().map(|ride| ride.distance_km).sum();
    let total_duration_sec: u64 = rides.iter().map(|ride| ride.duration_sec).sum();
    let max_distance_km = rides
        .iter()
        .map(|ride| ride.distance_km)
        .fold(0.0, f64::max);
    let max_speed_kmh = rides
        .iter()
        .map(|ride| ride.avg_speed_kmh)
        .fold(0.0, f64::max);

    RideStats {
        total_distance_km,
        total_duration_sec,
        rides_count: rides.len(),
        avg_speed_kmh: average_speed_kmh(total_distance_km, total_duration_sec),
        max_distance_km,
        max_speed_kmh,
    }
}
