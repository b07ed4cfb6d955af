use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db::{average_speed_kmh, NewRide},
    geo::{haversine_km, Fix},
};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Recording,
    Stopped,
}

/// What the presentation layer sees of the current session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_secs: u64,
    pub distance_km: f64,
    pub current_speed_kmh: f64,
    pub fix_count: u64,
}

/// Accumulated distance and time of one session.
///
/// After a session ends the totals stay readable (status back to `Idle`)
/// until the next `begin`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_secs: u64,
    pub distance_km: f64,
    pub fix_count: u64,
    last_fix: Option<Fix>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, started_at: DateTime<Utc>) {
        *self = Self {
            status: SessionStatus::Recording,
            started_at: Some(started_at),
            ..Self::default()
        };
    }

    /// One second of riding. Ignored unless recording.
    pub fn tick(&mut self) {
        if self.status == SessionStatus::Recording {
            self.elapsed_secs += 1;
        }
    }

    /// Adds the segment from the previous fix, if any. Returns the
    /// distance added in kilometres.
    pub fn record_fix(&mut self, fix: Fix) -> f64 {
        if self.status != SessionStatus::Recording {
            return 0.0;
        }

        let segment = match self.last_fix {
            Some(previous) => haversine_km(&previous, &fix),
            None => 0.0,
        };

        self.distance_km += segment;
        self.fix_count += 1;
        self.last_fix = Some(fix);
        segment
    }

    pub fn current_speed_kmh(&self) -> f64 {
        average_speed_kmh(self.distance_km, self.elapsed_secs)
    }

    /// Ends the session and produces the ride to hand to the repository.
    pub fn finish(&mut self, ended_at: DateTime<Utc>) -> NewRide {
        self.status = SessionStatus::Stopped;
        self.last_fix = None;
        NewRide::new(ended_at, self.elapsed_secs, self.distance_km)
    }

    /// Returns to `Idle`, keeping the totals of the last session.
    pub fn settle(&mut self) {
        self.status = SessionStatus::Idle;
        self.last_fix = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            started_at: self.started_at,
            elapsed_secs: self.elapsed_secs,
            distance_km: self.distance_km,
            current_speed_kmh: self.current_speed_kmh(),
            fix_count: self.fix_count,
        }
    }
}
