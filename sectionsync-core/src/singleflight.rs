//! Per-key collapsing of concurrent work.
//!
//! The first caller for a key becomes the leader: its future is spawned on
//! the runtime and every caller arriving while it runs awaits the same
//! shared result. The key is released by the spawned task itself, so the
//! slot is freed even if the work panics or all callers go away.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::debug;

use crate::error::SyncError;

type SharedCall<T> = Shared<BoxFuture<'static, Result<T, SyncError>>>;

pub struct SingleFlight<K, T>
where
    K: Eq + Hash,
{
    calls: Arc<DashMap<K, SharedCall<T>>>,
    leaders: Arc<AtomicU64>,
    waiters: Arc<AtomicU64>,
}

impl<K, T> Clone for SingleFlight<K, T>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
            leaders: Arc::clone(&self.leaders),
            waiters: Arc::clone(&self.waiters),
        }
    }
}

impl<K, T> fmt::Debug for SingleFlight<K, T>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.calls.len())
            .field("leaders", &self.leaders.load(Ordering::Relaxed))
            .field("waiters", &self.waiters.load(Ordering::Relaxed))
            .finish()
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            calls: Arc::new(DashMap::new()),
            leaders: Arc::new(AtomicU64::new(0)),
            waiters: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of keys with work currently running.
    pub fn in_flight(&self) -> usize {
        self.calls.len()
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.calls.contains_key(key)
    }

    /// Runs `work` unless work for `key` is already running, in which case
    /// the caller waits for that execution and receives its result.
    ///
    /// Dropping the returned future does not cancel the shared execution.
    pub async fn run<F>(&self, key: K, work: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, SyncError>> + Send + 'static,
    {
        let call = match self.calls.entry(key.clone()) {
            Entry::Occupied(existing) => {
                let waiters =
                    self.waiters.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(
                    "singleflight wait: key={:?}, leaders={}, waiters={}",
                    key,
                    self.leaders.load(Ordering::Relaxed),
                    waiters
                );
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                let leaders = self.leaders.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(
                    "singleflight lead: key={:?}, leaders={}, waiters={}",
                    key,
                    leaders,
                    self.waiters.load(Ordering::Relaxed)
                );
                let call = self.spawn(key.clone(), work);
                slot.insert(call.clone());
                call
            }
        };
        call.await
    }

    fn spawn<F>(&self, key: K, work: F) -> SharedCall<T>
    where
        F: Future<Output = Result<T, SyncError>> + Send + 'static,
    {
        let release = ReleaseOnDrop {
            calls: Arc::clone(&self.calls),
            key,
        };
        let handle = tokio::spawn(async move {
            let _release = release;
            work.await
        });
        async move {
            match handle.await {
                Ok(result) => result,
                Err(err) if err.is_panic() => {
                    Err(SyncError::Panicked(panic_message(err.into_panic())))
                }
                Err(err) => Err(SyncError::Panicked(err.to_string())),
            }
        }
        .boxed()
        .shared()
    }
}

struct ReleaseOnDrop<K, T>
where
    K: Eq + Hash + fmt::Debug,
{
    calls: Arc<DashMap<K, SharedCall<T>>>,
    key: K,
}

impl<K, T> Drop for ReleaseOnDrop<K, T>
where
    K: Eq + Hash + fmt::Debug,
{
    fn drop(&mut self) {
        if self.calls.remove(&self.key).is_some() {
            debug!("singleflight complete: key={:?}", self.key);
        }
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
