use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
    time::Duration,
};
use tokio_util::sync::CancellationToken;

use crate::{
    db::NewRide,
    error::{Result, RideError},
};

use super::{
    loop_worker::{recording_loop, LoopConfig},
    source::{Authorization, PositionSource, SubscriptionId},
    state::{SessionSnapshot, SessionState, SessionStatus},
};

const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Everything that has to be released when a session ends.
struct ActiveSession {
    subscription: SubscriptionId,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ActiveSession {
    /// Stops delivery at the source first, then waits for the loop to exit
    /// so nothing touches the state afterwards.
    async fn shutdown<P: PositionSource>(self, source: &P) {
        source.unsubscribe(self.subscription);
        self.cancel_token.cancel();
        if let Err(err) = self.handle.await {
            if !err.is_cancelled() {
                warn!("recording loop ended abnormally: {err}");
            }
        }
    }
}

/// Records one ride at a time from a position source and a one-second
/// ticker.
///
/// Dropping the recorder while a session is running releases the source
/// subscription and throws the session away.
pub struct RideRecorder<P: PositionSource> {
    source: Arc<P>,
    state: Arc<Mutex<SessionState>>,
    active: Mutex<Option<ActiveSession>>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

impl<P: PositionSource> RideRecorder<P> {
    pub fn new(source: Arc<P>) -> Self {
        let debug_mode = std::env::var("RIDEBATTLE_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let (snapshots, _) = watch::channel(SessionSnapshot::default());

        Self {
            source,
            state: Arc::new(Mutex::new(SessionState::new())),
            active: Mutex::new(None),
            snapshots: Arc::new(snapshots),
            tick_interval: DEFAULT_TICK,
            heartbeat_every_ticks: if debug_mode { 1 } else { 10 },
        }
    }

    /// Overrides the one-second tick. Takes effect from the next session.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn source(&self) -> &Arc<P> {
        &self.source
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Receives a new snapshot after every tick, fix and state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub async fn start(&self) -> Result<SessionSnapshot> {
        let mut active = self.active.lock().await;

        {
            let state = self.state.lock().await;
            if state.status != SessionStatus::Idle {
                return Err(RideError::InvalidState(
                    "a session is already recording".into(),
                ));
            }
        }

        match self.source.request_authorization().await {
            Ok(Authorization::Granted) => {}
            Ok(Authorization::Denied) => {
                warn!("Location permission denied; session not started");
                return Err(RideError::PermissionDenied);
            }
            Err(err) => {
                warn!("Authorization request failed: {err:#}");
                return Err(RideError::TrackingUnavailable(format!("{err:#}")));
            }
        }

        let (fix_tx, fix_rx) = mpsc::unbounded_channel();
        let subscription = self.source.subscribe(fix_tx).await.map_err(|err| {
            warn!("Failed to subscribe to position updates: {err:#}");
            RideError::TrackingUnavailable(format!("{err:#}"))
        })?;

        let snapshot = {
            let mut state = self.state.lock().await;
            state.begin(Utc::now());
            state.snapshot()
        };
        self.snapshots.send_replace(snapshot.clone());

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(recording_loop(
            self.state.clone(),
            fix_rx,
            self.snapshots.clone(),
            cancel_token.clone(),
            LoopConfig {
                tick_interval: self.tick_interval,
                heartbeat_every_ticks: self.heartbeat_every_ticks,
            },
        ));

        *active = Some(ActiveSession {
            subscription,
            cancel_token,
            handle,
        });

        info!("Ride session started");
        Ok(snapshot)
    }

    /// Ends the session and returns the finished ride. Persisting it is the
    /// caller's job.
    pub async fn stop(&self) -> Result<NewRide> {
        let mut active = self.active.lock().await;

        if self.state.lock().await.status != SessionStatus::Recording {
            return Err(RideError::InvalidState("no session is recording".into()));
        }

        if let Some(session) = active.take() {
            session.shutdown(self.source.as_ref()).await;
        }

        let (ride, snapshot) = {
            let mut state = self.state.lock().await;
            let ride = state.finish(Utc::now());
            state.settle();
            (ride, state.snapshot())
        };
        self.snapshots.send_replace(snapshot);

        info!(
            "Ride session stopped: {:.3} km in {} s",
            ride.distance_km, ride.duration_sec
        );
        Ok(ride)
    }

    /// Throws away a running session without producing a ride. Does nothing
    /// when idle.
    pub async fn discard(&self) {
        let mut active = self.active.lock().await;
        let Some(session) = active.take() else {
            return;
        };
        session.shutdown(self.source.as_ref()).await;

        let snapshot = {
            let mut state = self.state.lock().await;
            *state = SessionState::new();
            state.snapshot()
        };
        self.snapshots.send_replace(snapshot);
        info!("Ride session discarded");
    }
}

impl<P: PositionSource> Drop for RideRecorder<P> {
    fn drop(&mut self) {
        if let Some(session) = self.active.get_mut().take() {
            self.source.unsubscribe(session.subscription);
            session.cancel_token.cancel();
            session.handle.abort();
            info!("Recorder dropped mid-session; subscription released");
        }
    }
}
