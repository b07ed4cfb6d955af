//! Wires the recorder, ride repository and settings together and exposes the
//! commands the presentation layer calls.

use std::sync::Arc;

use anyhow::Result as AnyResult;
use chrono::Local;
use log::{error, info, warn};
use serde::Serialize;

use crate::{
    db::{Database, KeyValueStore, Ride},
    error::RideError,
    leaderboard::{rank, Ranking},
    paths::AppPaths,
    recorder::{PositionSource, RideRecorder, SessionSnapshot},
    rides::RideRepository,
    settings::SettingsStore,
    stats::{compute_series, compute_summary, today_in, ChartSeries, Period, RideStats},
};

/// Result of `stop_session`. The ride is kept in memory even when saving it
/// failed; `warning` then carries the message to show.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedRide {
    pub ride: Ride,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardView {
    pub ranking: Ranking,
    pub rides_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub profile_name: String,
    pub summary: RideStats,
    pub leaderboard: LeaderboardView,
    pub chart: ChartSeries,
    pub latest_ride: Option<Ride>,
}

pub struct RideBattle<S: KeyValueStore, P: PositionSource> {
    settings: SettingsStore,
    rides: RideRepository<S>,
    recorder: RideRecorder<P>,
}

impl<P: PositionSource> RideBattle<Database, P> {
    /// Opens the on-disk store and settings under `paths`.
    pub fn open(paths: &AppPaths, source: Arc<P>) -> AnyResult<Self> {
        std::fs::create_dir_all(&paths.data_dir)?;
        let database = Database::new(paths.db_path())?;
        let settings = SettingsStore::new(paths.settings_path())?;
        Ok(Self::new(settings, database, RideRecorder::new(source)))
    }
}

impl<S: KeyValueStore, P: PositionSource> RideBattle<S, P> {
    pub fn new(settings: SettingsStore, store: S, recorder: RideRecorder<P>) -> Self {
        Self {
            settings,
            rides: RideRepository::new(store),
            recorder,
        }
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn rides(&self) -> &RideRepository<S> {
        &self.rides
    }

    pub fn recorder(&self) -> &RideRecorder<P> {
        &self.recorder
    }

    /// Loads the stored rides, recovering from corruption or read failures
    /// with an empty collection. Returns the recovered error, if any.
    pub async fn init(&self) -> Option<RideError> {
        match self.rides.load().await {
            Ok(rides) => {
                info!("RideBattle ready with {} rides", rides.len());
                None
            }
            Err(err) => {
                error!("Starting with no rides: {err}");
                Some(err)
            }
        }
    }

    pub async fn start_session(&self) -> Result<SessionSnapshot, String> {
        self.recorder.start().await.map_err(|e| e.to_string())
    }

    /// Stops recording and saves the ride.
    pub async fn stop_session(&self) -> Result<StoppedRide, String> {
        let finished = self.recorder.stop().await.map_err(|e| e.to_string())?;
        let (ride, persisted) = self.rides.append_reporting(finished).await;

        let warning = match persisted {
            Ok(()) => None,
            Err(err) => {
                warn!("Ride {} kept in memory only: {err}", ride.id);
                Some(err.to_string())
            }
        };
        Ok(StoppedRide { ride, warning })
    }

    pub async fn discard_session(&self) {
        self.recorder.discard().await;
    }

    pub async fn session_snapshot(&self) -> SessionSnapshot {
        self.recorder.snapshot().await
    }

    pub async fn list_rides(&self) -> Vec<Ride> {
        self.rides.list().await
    }

    pub async fn latest_ride(&self) -> Option<Ride> {
        self.rides.latest().await
    }

    pub async fn delete_ride(&self, id: &str) -> Result<bool, String> {
        self.rides.remove(id).await.map_err(|e| e.to_string())
    }

    pub async fn summary(&self) -> RideStats {
        compute_summary(&self.rides.list().await)
    }

    /// Daily distance for the trailing `period`, in local calendar days,
    /// labelled in the configured locale.
    pub async fn chart(&self, period: Period) -> ChartSeries {
        let rides = self.rides.list().await;
        let locale = self.settings.chart_locale();
        compute_series(&rides, period, today_in(&Local), &Local, locale)
    }

    pub async fn leaderboard(&self) -> LeaderboardView {
        let summary = self.summary().await;
        let ranking = rank(
            &self.settings.leaderboard_pool(),
            &self.settings.profile_name(),
            summary.total_distance_km,
        );
        LeaderboardView {
            ranking,
            rides_count: summary.rides_count,
        }
    }

    /// Everything the profile screen shows, for the given chart period.
    pub async fn report(&self, period: Period) -> Report {
        Report {
            profile_name: self.settings.profile_name(),
            summary: self.summary().await,
            leaderboard: self.leaderboard().await,
            chart: self.chart(period).await,
            latest_ride: self.latest_ride().await,
        }
    }
}
