//! Opt-in cache for title search results.
//!
//! [`SearchCache`] keeps `search_titles` results keyed on (query, limit)
//! so repeated searches skip the content source. It is independent of the
//! page cache: search results are not [`Cacheable`](super::Cacheable)
//! values and have no capacity-eviction contract, so they live in moka's
//! TTL cache instead.
//!
//! Activated via [`HuginnBuilder::search_cache()`](crate::HuginnBuilder::search_cache).
//! The request ledger records every search whether or not it hits here.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use moka::future::Cache;

use crate::telemetry;

/// Configuration for the search result cache.
///
/// ```rust
/// # use huginn::SearchCacheConfig;
/// # use std::time::Duration;
/// let config = SearchCacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(300));
/// ```
#[derive(Debug, Clone)]
pub struct SearchCacheConfig {
    /// Maximum number of cached result lists. Default: 1,000.
    pub max_entries: u64,
    /// Time-to-live for cached results. Default: 10 minutes.
    pub ttl: Duration,
}

impl Default for SearchCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(600),
        }
    }
}

impl SearchCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached result lists.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached results.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// In-memory TTL cache of search results.
pub struct SearchCache {
    cache: Cache<u64, Vec<String>>,
}

impl SearchCache {
    pub fn new(config: &SearchCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { cache }
    }

    /// Look up cached titles. Emits cache hit/miss metrics.
    pub async fn get(&self, query: &str, limit: usize) -> Option<Vec<String>> {
        match self.cache.get(&cache_key(query, limit)).await {
            Some(titles) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "cache" => "search").increment(1);
                Some(titles)
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "cache" => "search")
                    .increment(1);
                None
            }
        }
    }

    pub async fn insert(&self, query: &str, limit: usize, titles: Vec<String>) {
        self.cache.insert(cache_key(query, limit), titles).await;
    }
}

/// Hash of (query, limit). Only stable within one process.
fn cache_key(query: &str, limit: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    limit.hash(&mut hasher);
    hasher.finish()
}
