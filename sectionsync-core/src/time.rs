//! Clock abstraction so staleness decisions can be tested deterministically.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, TimeDelta, Utc};

/// Source of the current wall-clock time.
pub trait TimeProvider: Send + Sync + 'static {
    /// Get the current UTC datetime
    fn utc_now(&self) -> DateTime<Utc>;
}

/// Production time provider backed by the system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests.
///
/// Clones share the same instant, so a test can keep a handle and advance
/// the time the orchestrator observes.
#[derive(Clone, Debug)]
pub struct VirtualTimeProvider {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl VirtualTimeProvider {
    /// Create a virtual clock starting at the current system time
    pub fn new() -> Self {
        Self::new_at(Utc::now())
    }

    /// Create a virtual clock starting at a specific time
    pub fn new_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.lock();
        *now += by;
    }

    /// Jump to an absolute time
    pub fn set(&self, to: DateTime<Utc>) {
        *self.lock() = to;
    }

    fn lock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for VirtualTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for VirtualTimeProvider {
    fn utc_now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}
