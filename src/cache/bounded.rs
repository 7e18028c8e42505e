//! Capacity- and age-bounded cache.
//!
//! [`BoundedCache`] holds at most `capacity` values, each expiring `ttl`
//! after its last refresh. Every operation takes a single lock for its
//! whole duration, so callers observe each call as one atomic step and
//! need no locking of their own.
//!
//! # Eviction
//!
//! When an insertion finds the cache full, expired entries are purged
//! first. If that frees nothing, the entry with the nearest expiry is
//! evicted. Since all entries share one ttl this is the least recently
//! refreshed entry, but the rule is stated on expiry so it stays correct
//! if per-entry ttls are ever introduced.
//!
//! Expired entries that are never touched again linger until the next
//! purge or until a lookup on their key removes them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::clock::{Clock, Millis, SystemClock};
use crate::telemetry;
use crate::{HuginnError, Result};

/// A value with a stable string identity, usable as a cache entry.
///
/// Two values with the same `cache_id` occupy the same slot.
pub trait Cacheable {
    fn cache_id(&self) -> &str;
}

impl Cacheable for String {
    fn cache_id(&self) -> &str {
        self
    }
}

/// Page text keyed on its title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub title: String,
    pub text: String,
}

impl CachedPage {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

impl Cacheable for CachedPage {
    fn cache_id(&self) -> &str {
        &self.title
    }
}

/// Configuration for a [`BoundedCache`].
///
/// ```rust
/// # use huginn::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .capacity(64)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries. Default: 32.
    pub capacity: usize,
    /// Time an entry stays live after its last refresh. Default: 1 hour.
    pub ttl: Duration,
    /// Value of the `cache` label on this cache's metrics. Default: "bounded".
    pub name: &'static str,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 32,
            ttl: Duration::from_secs(3600),
            name: "bounded",
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of entries.
    pub fn capacity(mut self, n: usize) -> Self {
        self.capacity = n;
        self
    }

    /// Set the time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the metrics label identifying this cache.
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

struct CacheEntry<T> {
    value: T,
    expires_at: Millis,
}

impl<T> CacheEntry<T> {
    fn is_live(&self, now: Millis) -> bool {
        now < self.expires_at
    }
}

/// Thread-safe capacity- and age-bounded store. See module docs.
pub struct BoundedCache<T> {
    capacity: usize,
    ttl: Millis,
    name: &'static str,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Cacheable + Clone> BoundedCache<T> {
    /// Create a cache on the system clock.
    ///
    /// Fails with `InvalidArgument` for a zero capacity.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create a cache reading time from `clock`.
    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.capacity == 0 {
            return Err(HuginnError::InvalidArgument(
                "cache capacity must be at least 1".into(),
            ));
        }
        Ok(Self {
            capacity: config.capacity,
            ttl: config.ttl.as_millis() as Millis,
            name: config.name,
            clock,
            entries: Mutex::new(HashMap::new()),
        })
    }

    // The map is only mutated through complete statements, so a panic
    // elsewhere cannot leave it half-written.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `value` under its identity.
    ///
    /// Returns `false` without touching anything if a live entry with the
    /// same identity already exists.
    pub fn put(&self, value: T) -> bool {
        let now = self.clock.now_millis();
        let mut entries = self.lock();
        let id = value.cache_id().to_owned();

        match entries.get(&id).map(|entry| entry.is_live(now)) {
            Some(true) => return false,
            Some(false) => {
                entries.remove(&id);
            }
            None => {}
        }

        if entries.len() >= self.capacity {
            let before = entries.len();
            entries.retain(|_, entry| entry.is_live(now));
            let purged = before - entries.len();
            if purged > 0 {
                metrics::counter!(
                    telemetry::CACHE_EVICTIONS_TOTAL,
                    "cache" => self.name,
                    "reason" => "expired"
                )
                    .increment(purged as u64);
                debug!(purged, "purged expired cache entries");
            }
        }

        if entries.len() >= self.capacity {
            let victim = entries
                .iter()
                .min_by(|(ka, a), (kb, b)| a.expires_at.cmp(&b.expires_at).then(ka.cmp(kb)))
                .map(|(key, _)| key.clone());
            if let Some(victim) = victim {
                entries.remove(&victim);
                metrics::counter!(
                    telemetry::CACHE_EVICTIONS_TOTAL,
                    "cache" => self.name,
                    "reason" => "capacity"
                )
                    .increment(1);
                debug!(key = %victim, "evicted nearest-expiry cache entry");
            }
        }

        entries.insert(
            id,
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
        true
    }

    /// Fetch the live value stored under `key`.
    ///
    /// Does not refresh the entry. An expired entry is removed and reported
    /// as `NotFound`.
    pub fn get(&self, key: &str) -> Result<T> {
        let now = self.clock.now_millis();
        let mut entries = self.lock();
        if let Some(entry) = entries.get(key).filter(|entry| entry.is_live(now)) {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "cache" => self.name).increment(1);
            return Ok(entry.value.clone());
        }
        entries.remove(key);
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "cache" => self.name).increment(1);
        Err(HuginnError::NotFound(key.to_owned()))
    }

    /// Extend the expiry of a live entry to `now + ttl`.
    ///
    /// Returns `false` (and drops any stale mapping) if `key` is not live.
    pub fn touch(&self, key: &str) -> bool {
        let now = self.clock.now_millis();
        let mut entries = self.lock();
        self.refresh(&mut entries, key, now)
    }

    /// Replace the value stored under `value`'s identity and refresh it.
    ///
    /// Returns `false` with no mutation if that identity is not live.
    pub fn update(&self, value: T) -> bool {
        let now = self.clock.now_millis();
        let mut entries = self.lock();
        let id = value.cache_id().to_owned();
        if !self.refresh(&mut entries, &id, now) {
            return false;
        }
        if let Some(entry) = entries.get_mut(&id) {
            entry.value = value;
        }
        true
    }

    fn refresh(
        &self,
        entries: &mut HashMap<String, CacheEntry<T>>,
        key: &str,
        now: Millis,
    ) -> bool {
        if let Some(entry) = entries.get_mut(key).filter(|entry| entry.is_live(now)) {
            entry.expires_at = now + self.ttl;
            return true;
        }
        entries.remove(key);
        false
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl)
    }
}
