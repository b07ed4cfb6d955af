use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use ridebattle_lib::{
    db::{KeyValueStore, MemoryStore},
    geo::Fix,
};

#[allow(dead_code)]
pub const BERLIN: (f64, f64) = (52.5200, 13.4050);
#[allow(dead_code)]
pub const PARIS: (f64, f64) = (48.8566, 2.3522);

#[allow(dead_code)]
pub fn fix((latitude, longitude): (f64, f64)) -> Fix {
    Fix::new(latitude, longitude, Utc::now())
}

#[allow(dead_code)]
pub fn day(d: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, d, hour, 0, 0).unwrap()
}

/// Lets spawned tasks drain their queues without reaching the next tick.
#[allow(dead_code)]
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// A store whose writes yield before landing, to widen race windows.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct SlowStore {
    pub inner: MemoryStore,
}

impl KeyValueStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.inner.set(key, value).await
    }
}

/// A store whose first `failing_reads` reads error out, as a flaky disk would.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct FlakyReadStore {
    pub inner: MemoryStore,
    failing_reads: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl FlakyReadStore {
    pub fn failing_first(reads: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing_reads: Arc::new(AtomicUsize::new(reads)),
        }
    }
}

impl KeyValueStore for FlakyReadStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let remaining = self.failing_reads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_reads.store(remaining - 1, Ordering::SeqCst);
            return Err(anyhow!("transient read error on '{key}'"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.inner.set(key, value).await
    }
}
