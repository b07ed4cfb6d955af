use std::sync::Arc;

use tokio::{
    sync::{mpsc, watch, Mutex},
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::geo::Fix;

use super::state::{SessionSnapshot, SessionState, SessionStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub(crate) struct LoopConfig {
    pub tick_interval: Duration,
    pub heartbeat_every_ticks: u32,
}

/// Applies ticks and fixes to the shared session state, one at a time,
/// until cancelled or the session leaves `Recording`.
///
/// Ticks that are missed while the runtime is suspended are skipped, so
/// paused time is never counted.
pub(crate) async fn recording_loop(
    state: Arc<Mutex<SessionState>>,
    mut fixes: mpsc::UnboundedReceiver<Fix>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    cancel_token: CancellationToken,
    config: LoopConfig,
) {
    let period = config.tick_interval;
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let heartbeat_every = config.heartbeat_every_ticks.max(1);
    let mut source_open = true;

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("recording loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let snapshot = {
                    let mut guard = state.lock().await;
                    if guard.status != SessionStatus::Recording {
                        break;
                    }
                    guard.tick();
                    guard.snapshot()
                };

                if snapshot.elapsed_secs % u64::from(heartbeat_every) == 0 {
                    log_info!(
                        "recording: {} s, {:.3} km, {} fixes",
                        snapshot.elapsed_secs,
                        snapshot.distance_km,
                        snapshot.fix_count
                    );
                }
                snapshots.send_replace(snapshot);
            }
            received = fixes.recv(), if source_open => {
                let Some(fix) = received else {
                    log_warn!("position source closed its stream; only time is recorded now");
                    source_open = false;
                    continue;
                };

                let snapshot = {
                    let mut guard = state.lock().await;
                    if guard.status != SessionStatus::Recording {
                        break;
                    }
                    guard.record_fix(fix);
                    guard.snapshot()
                };
                snapshots.send_replace(snapshot);
            }
        }
    }
}
