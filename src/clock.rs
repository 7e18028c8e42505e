//! Millisecond time source shared by the cache, the ledger and analytics.
//!
//! All timestamps are milliseconds since the Unix epoch. [`SystemClock`]
//! reads the wall clock once and advances with a monotonic [`Instant`]
//! afterwards, so timestamps never go backwards within a process while
//! still lining up with ledgers persisted by earlier runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub type Millis = u64;

/// Source of the current time in milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> Millis;
}

/// Monotonic clock anchored to the Unix epoch at construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin_wall: Millis,
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        let origin_wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Millis)
            .unwrap_or(0);
        Self {
            origin_wall,
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> Millis {
        self.origin_wall + self.origin.elapsed().as_millis() as Millis
    }
}

/// Manually driven clock.
///
/// Starts at the given instant and only moves when told to. Useful for
/// exercising TTL expiry and windowed analytics without sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, millis: Millis) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.now
            .fetch_add(by.as_millis() as Millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}
