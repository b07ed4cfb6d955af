//! Durable ride collection kept newest-first and persisted as one blob.

use std::collections::HashSet;

use chrono::Utc;
use rand::Rng;
use tokio::sync::Mutex;

use crate::{
    db::{KeyValueStore, NewRide, Ride},
    error::{Result, RideError},
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Store key holding the whole ride collection.
pub const RIDES_KEY: &str = "RIDE_BATTLE_RIDES";

/// Key a corrupt collection blob is copied to before it is first overwritten.
pub const CORRUPT_BACKUP_KEY: &str = "RIDE_BATTLE_RIDES.corrupt";

const ID_SUFFIX_LEN: usize = 9;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Default)]
struct RepositoryState {
    rides: Vec<Ride>,
    issued_ids: HashSet<String>,
    /// Unparseable bytes found by the last read, kept until backed up.
    corrupt_blob: Option<Vec<u8>>,
    loaded: bool,
    /// Whether the stored blob has been read since the repository was
    /// created. Writes are refused until it has, so unseen rides are never
    /// overwritten.
    synced: bool,
}

/// Orders rides newest first. Equal dates keep their existing relative order.
pub fn sort_newest_first(rides: &mut [Ride]) {
    rides.sort_by(|a, b| b.date.cmp(&a.date));
}

pub struct RideRepository<S> {
    store: S,
    state: Mutex<RepositoryState>,
}

impl<S: KeyValueStore> RideRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: Mutex::new(RepositoryState::default()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the persisted collection and replaces the in-memory one.
    ///
    /// A missing key is an empty collection. On any failure the stored bytes
    /// are not touched and the in-memory collection holds only rides that
    /// were appended while the store could not be read. Nothing is written
    /// until a read succeeds.
    pub async fn load(&self) -> Result<Vec<Ride>> {
        let mut state = self.state.lock().await;
        state.loaded = true;
        if state.synced {
            state.rides.clear();
        }
        self.read_stored(&mut state).await?;
        Ok(state.rides.clone())
    }

    /// Reads the stored blob and puts its rides behind any rides that only
    /// exist in memory so far.
    async fn read_stored(&self, state: &mut RepositoryState) -> Result<()> {
        state.synced = false;
        state.corrupt_blob = None;

        let bytes = match self.store.get(RIDES_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log_info!("No stored rides under {RIDES_KEY}");
                state.synced = true;
                return Ok(());
            }
            Err(err) => {
                log_error!("Failed to read rides from store: {err:#}");
                return Err(RideError::PersistenceFailed(format!("{err:#}")));
            }
        };

        match serde_json::from_slice::<Vec<Ride>>(&bytes) {
            Ok(mut stored) => {
                sort_newest_first(&mut stored);
                if has_duplicate_ids(&stored) {
                    log_warn!("Stored rides contain duplicate identifiers");
                }
                log_info!("Loaded {} rides", stored.len());

                state.issued_ids.extend(stored.iter().map(|ride| ride.id.clone()));
                let stored_ids: HashSet<String> =
                    stored.iter().map(|ride| ride.id.clone()).collect();
                state.rides.retain(|ride| !stored_ids.contains(&ride.id));
                state.rides.extend(stored);
                state.synced = true;
                Ok(())
            }
            Err(err) => {
                log_error!(
                    "Stored rides blob ({} bytes) is corrupt, starting empty: {err}",
                    bytes.len()
                );
                state.corrupt_blob = Some(bytes);
                state.synced = true;
                Err(RideError::CorruptState(err.to_string()))
            }
        }
    }

    /// Makes sure the stored blob has been seen before it is overwritten.
    /// A corrupt blob counts as seen; it is backed up by `persist`.
    async fn ensure_synced(&self, state: &mut RepositoryState) -> Result<()> {
        if state.synced {
            return Ok(());
        }
        match self.read_stored(state).await {
            Ok(()) | Err(RideError::CorruptState(_)) => {
                state.loaded = true;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Adds a finished ride and persists the collection.
    ///
    /// On `PersistenceFailed` the ride is still part of the in-memory
    /// collection; use [`append_reporting`](Self::append_reporting) to keep
    /// hold of it in that case.
    pub async fn append(&self, ride: NewRide) -> Result<Ride> {
        let (ride, persisted) = self.append_reporting(ride).await;
        persisted.map(|()| ride)
    }

    /// Like [`append`](Self::append) but always returns the stored ride
    /// together with the outcome of the write.
    pub async fn append_reporting(&self, ride: NewRide) -> (Ride, Result<()>) {
        let mut state = self.state.lock().await;

        let id = fresh_id(&state.issued_ids);
        state.issued_ids.insert(id.clone());
        let ride = ride.with_id(id);

        // Prepend only; ordering is re-established by the next load.
        state.rides.insert(0, ride.clone());

        let persisted = match self.ensure_synced(&mut state).await {
            Ok(()) => self.persist(&mut state).await,
            Err(err) => {
                log_warn!("Ride {} kept in memory; stored rides could not be read", ride.id);
                Err(err)
            }
        };
        if persisted.is_ok() {
            log_info!(
                "Saved ride {} ({:.2} km in {} s)",
                ride.id,
                ride.distance_km,
                ride.duration_sec
            );
        }
        (ride, persisted)
    }

    /// Deletes a ride by identifier. Its identifier is never issued again.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        self.ensure_synced(&mut state).await?;
        let before = state.rides.len();
        state.rides.retain(|ride| ride.id != id);
        if state.rides.len() == before {
            return Ok(false);
        }
        self.persist(&mut state).await?;
        log_info!("Removed ride {id}");
        Ok(true)
    }

    pub async fn list(&self) -> Vec<Ride> {
        self.state.lock().await.rides.clone()
    }

    pub async fn latest(&self) -> Option<Ride> {
        self.state.lock().await.rides.first().cloned()
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.loaded
    }

    /// Writes the whole collection. Runs with the state lock held so
    /// concurrent writers are serialized.
    async fn persist(&self, state: &mut RepositoryState) -> Result<()> {
        if let Some(corrupt) = state.corrupt_blob.clone() {
            if let Err(err) = self.store.set(CORRUPT_BACKUP_KEY, corrupt).await {
                log_error!("Failed to back up corrupt rides blob: {err:#}");
                return Err(RideError::PersistenceFailed(format!("{err:#}")));
            }
            log_warn!("Corrupt rides blob copied to {CORRUPT_BACKUP_KEY}");
            state.corrupt_blob = None;
        }

        let blob = serde_json::to_vec(&state.rides)
            .map_err(|err| RideError::PersistenceFailed(err.to_string()))?;

        self.store.set(RIDES_KEY, blob).await.map_err(|err| {
            log_error!("Failed to persist {} rides: {err:#}", state.rides.len());
            RideError::PersistenceFailed(format!("{err:#}"))
        })
    }
}

fn has_duplicate_ids(rides: &[Ride]) -> bool {
    let mut seen = HashSet::with_capacity(rides.len());
    !rides.iter().all(|ride| seen.insert(ride.id.as_str()))
}

/// Millisecond timestamp followed by a random base-36 suffix, retried until
/// it differs from every identifier seen so far.
fn fresh_id(issued: &HashSet<String>) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        let id = format!("{}{}", Utc::now().timestamp_millis(), suffix);
        if !issued.contains(&id) {
            return id;
        }
    }
}
