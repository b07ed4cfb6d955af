//! The boundary to whatever produces live position fixes.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
    },
};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::geo::Fix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Authorization {
    Granted,
    Denied,
}

/// Where a subscribed source delivers fixes, one message per fix.
pub type FixSink = mpsc::UnboundedSender<Fix>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

pub trait PositionSource: Send + Sync + 'static {
    /// Asks the rider for location access.
    fn request_authorization(&self) -> impl Future<Output = Result<Authorization>> + Send;

    /// Starts delivering fixes into `sink` until unsubscribed.
    fn subscribe(&self, sink: FixSink) -> impl Future<Output = Result<SubscriptionId>> + Send;

    /// Stops delivery. Unknown or already released ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// A source driven by hand: fixes are pushed by the caller.
///
/// Useful for tests and for replaying recorded tracks.
pub struct ManualSource {
    authorization: Mutex<Authorization>,
    fail_subscribe: AtomicBool,
    next_id: AtomicU64,
    sinks: Mutex<HashMap<SubscriptionId, FixSink>>,
}

impl Default for ManualSource {
    fn default() -> Self {
        Self {
            authorization: Mutex::new(Authorization::Granted),
            fail_subscribe: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            sinks: Mutex::new(HashMap::new()),
        }
    }
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_authorization(&self, authorization: Authorization) {
        *lock(&self.authorization) = authorization;
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// Delivers `fix` to every live subscription. Returns how many received it.
    pub fn push(&self, fix: Fix) -> usize {
        let sinks = lock(&self.sinks);
        sinks.values().filter(|sink| sink.send(fix).is_ok()).count()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.sinks).len()
    }
}

impl PositionSource for ManualSource {
    async fn request_authorization(&self) -> Result<Authorization> {
        Ok(*lock(&self.authorization))
    }

    async fn subscribe(&self, sink: FixSink) -> Result<SubscriptionId> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            bail!("position updates are not available");
        }
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        lock(&self.sinks).insert(id, sink);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        lock(&self.sinks).remove(&id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
