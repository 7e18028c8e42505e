//! Builder for configuring mediator instances

use std::sync::Arc;

use tracing::info;

use super::Mediator;
use crate::cache::{BoundedCache, CacheConfig, SearchCache, SearchCacheConfig};
use crate::clock::{Clock, SystemClock};
use crate::ledger::RequestLedger;
use crate::ledger::store::LedgerStore;
use crate::path::{DEFAULT_MAX_CONCURRENT_FETCHES, PathFinder};
use crate::source::{ContentSource, RetryConfig, RetryingContentSource, WikiClient, WikiConfig};
use crate::{HuginnError, Result};

/// Main entry point for creating mediator instances.
pub struct Huginn;

impl Huginn {
    /// Create a new builder for configuring the mediator.
    pub fn builder() -> HuginnBuilder {
        HuginnBuilder::new()
    }
}

/// Builder for configuring mediator instances.
///
/// ```rust,no_run
/// # use huginn::{CacheConfig, Huginn, RetryConfig, WikiConfig};
/// # use std::time::Duration;
/// # fn example() -> huginn::Result<()> {
/// let mediator = Huginn::builder()
///     .wiki(WikiConfig::default())
///     .cache(CacheConfig::new().capacity(64).ttl(Duration::from_secs(600)))
///     .retry(RetryConfig::new())
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct HuginnBuilder {
    source: Option<Arc<dyn ContentSource>>,
    wiki: Option<WikiConfig>,
    cache: CacheConfig,
    clock: Option<Arc<dyn Clock>>,
    ledger: Option<Arc<RequestLedger>>,
    store: Option<Arc<dyn LedgerStore>>,
    search_cache: Option<SearchCacheConfig>,
    retry: Option<RetryConfig>,
    max_concurrent_fetches: usize,
}

impl HuginnBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            wiki: None,
            cache: CacheConfig::default(),
            clock: None,
            ledger: None,
            store: None,
            search_cache: None,
            retry: None,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    /// Use a custom content source. Takes precedence over [`wiki()`](Self::wiki).
    pub fn content_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Read pages from a MediaWiki instance.
    pub fn wiki(mut self, config: WikiConfig) -> Self {
        self.wiki = Some(config);
        self
    }

    /// Configure the page cache (default: 32 entries, 1 hour).
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Time source shared by the cache and the ledger.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use an existing ledger instead of creating (or loading) one.
    pub fn ledger(mut self, ledger: Arc<RequestLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Load the ledger from `store` at build time and persist it on
    /// [`Mediator::flush()`].
    pub fn ledger_store(mut self, store: Arc<dyn LedgerStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Enable caching of search results.
    pub fn search_cache(mut self, config: SearchCacheConfig) -> Self {
        self.search_cache = Some(config);
        self
    }

    /// Retry transient content source failures.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Bound on parallel link fetches per path search (default: 8).
    pub fn max_concurrent_fetches(mut self, n: usize) -> Self {
        self.max_concurrent_fetches = n;
        self
    }

    /// Build the mediator.
    pub fn build(self) -> Result<Mediator> {
        let mut source: Arc<dyn ContentSource> = match (self.source, self.wiki) {
            (Some(source), _) => source,
            (None, Some(config)) => Arc::new(WikiClient::with_config(&config)?),
            (None, None) => {
                return Err(HuginnError::Configuration(
                    "no content source configured".into(),
                ));
            }
        };
        if let Some(config) = self.retry {
            source = Arc::new(RetryingContentSource::new(source, config));
        }

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);
        let page_config = self.cache.clone().name("page");
        let cache = BoundedCache::with_clock(&page_config, Arc::clone(&clock))?;

        let ledger = match (self.ledger, &self.store) {
            (Some(ledger), _) => ledger,
            (None, Some(store)) => Arc::new(RequestLedger::from_snapshot(store.load()?, clock)),
            (None, None) => Arc::new(RequestLedger::with_clock(clock)),
        };

        let path_finder =
            PathFinder::new(Arc::clone(&source)).max_concurrent_fetches(self.max_concurrent_fetches);
        let search_cache = self.search_cache.as_ref().map(SearchCache::new);

        info!(
            source = source.name(),
            cache_capacity = cache.capacity(),
            ttl_secs = cache.ttl().as_secs(),
            ledger_entries = ledger.len(),
            search_cache = search_cache.is_some(),
            "mediator ready"
        );

        Ok(Mediator::new(
            source,
            cache,
            ledger,
            path_finder,
            search_cache,
            self.store,
        ))
    }
}

impl Default for HuginnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
