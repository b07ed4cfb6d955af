//! Position samples and great-circle distance between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// One position sample delivered by the position source.
///
/// Latitude must be within −90..90 and longitude within −180..180; the
/// distance function does not validate them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }
}

/// Great-circle surface distance between two fixes in kilometres.
///
/// Uses the haversine formula. The intermediate term is clamped to `[0, 1]`
/// so rounding near antipodal points can never produce NaN.
pub fn haversine_km(a: &Fix, b: &Fix) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(lat: f64, lon: f64) -> Fix {
        Fix::new(lat, lon, Utc::now())
    }

    #[test]
    fn identical_points_are_zero() {
        let berlin = fix(52.5200, 13.4050);
        assert_eq!(haversine_km(&berlin, &berlin), 0.0);

        let pole = fix(90.0, 0.0);
        assert_eq!(haversine_km(&pole, &pole), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (fix(52.5200, 13.4050), fix(48.8566, 2.3522)),
            (fix(-33.8688, 151.2093), fix(51.5074, -0.1278)),
            (fix(0.0, 179.9), fix(0.0, -179.9)),
            (fix(89.9, 45.0), fix(-89.9, -135.0)),
        ];

        for (a, b) in pairs {
            let ab = haversine_km(&a, &b);
            let ba = haversine_km(&b, &a);
            assert!(
                (ab - ba).abs() <= 1e-9 * ab.max(1.0),
                "asymmetric: {ab} vs {ba}"
            );
        }
    }

    #[test]
    fn berlin_to_paris() {
        let berlin = fix(52.5200, 13.4050);
        let paris = fix(48.8566, 2.3522);
        let d = haversine_km(&berlin, &paris);
        assert!((d - 877.5).abs() < 2.0, "got {d}");
    }

    #[test]
    fn antipodal_points_are_finite() {
        let a = fix(0.0, 0.0);
        let b = fix(0.0, 180.0);
        let d = haversine_km(&a, &b);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn dateline_crossing_is_short() {
        let a = fix(0.0, 179.9);
        let b = fix(0.0, -179.9);
        assert!(haversine_km(&a, &b) < 25.0);
    }
}
