//! Mediator: the operations exposed to clients.
//!
//! [`Mediator`] composes the page cache, the request ledger, the content
//! source and the path finder. Every operation records its invocation in
//! the ledger before doing anything else, so failed and timed-out calls
//! still count toward peak load. Page fetches and searches also record
//! their title or query as a key for the popularity rankings.
//!
//! Build one with [`Huginn::builder()`](crate::Huginn::builder).

mod builder;

pub use builder::{Huginn, HuginnBuilder};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use crate::cache::{BoundedCache, CachedPage, SearchCache};
use crate::ledger::analytics::{self, DEFAULT_PEAK_WINDOW_SECS};
use crate::ledger::store::LedgerStore;
use crate::ledger::RequestLedger;
use crate::path::PathFinder;
use crate::source::ContentSource;
use crate::telemetry;
use crate::Result;

/// Cache-fronted, ledger-recording facade over a content source.
pub struct Mediator {
    source: Arc<dyn ContentSource>,
    cache: BoundedCache<CachedPage>,
    ledger: Arc<RequestLedger>,
    path_finder: PathFinder,
    search_cache: Option<SearchCache>,
    store: Option<Arc<dyn LedgerStore>>,
}

impl Mediator {
    pub(crate) fn new(
        source: Arc<dyn ContentSource>,
        cache: BoundedCache<CachedPage>,
        ledger: Arc<RequestLedger>,
        path_finder: PathFinder,
        search_cache: Option<SearchCache>,
        store: Option<Arc<dyn LedgerStore>>,
    ) -> Self {
        Self {
            source,
            cache,
            ledger,
            path_finder,
            search_cache,
            store,
        }
    }

    /// Text of the page titled `title`.
    ///
    /// A cached copy is refreshed and returned. Otherwise the text is
    /// fetched from the source and cached.
    #[instrument(skip(self), fields(operation = "get_page"))]
    pub async fn get_page(&self, title: &str) -> Result<String> {
        let start = Instant::now();
        self.ledger.record(Some(title));

        if self.cache.touch(title) {
            if let Ok(page) = self.cache.get(title) {
                debug!(title, "page served from cache");
                record_request("get_page", start, true);
                return Ok(page.text);
            }
        }

        let result = self.source.fetch_text(title).await;
        if let Ok(text) = &result {
            self.cache.put(CachedPage::new(title, text.clone()));
        }
        record_request("get_page", start, result.is_ok());
        result
    }

    /// Up to `limit` page titles matching `query`.
    #[instrument(skip(self), fields(operation = "search"))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let start = Instant::now();
        self.ledger.record(Some(query));

        if let Some(cache) = &self.search_cache {
            if let Some(titles) = cache.get(query, limit).await {
                record_request("search", start, true);
                return Ok(titles);
            }
        }

        let result = self.source.search_titles(query, limit).await;
        if let (Some(cache), Ok(titles)) = (&self.search_cache, &result) {
            cache.insert(query, limit, titles.clone()).await;
        }
        record_request("search", start, result.is_ok());
        result
    }

    /// The `limit` most requested titles and queries of all time.
    pub fn zeitgeist(&self, limit: usize) -> Vec<String> {
        let start = Instant::now();
        self.ledger.record(None);
        let ranked = self.ledger.inspect(|s| analytics::zeitgeist(s, limit));
        record_request("zeitgeist", start, true);
        ranked
    }

    /// The `max_items` most requested titles and queries over the last
    /// `window_secs` seconds.
    pub fn trending(&self, window_secs: u64, max_items: usize) -> Vec<String> {
        let start = Instant::now();
        let now = self.ledger.record(None);
        let ranked = self
            .ledger
            .inspect(|s| analytics::trending(s, now, window_secs, max_items));
        record_request("trending", start, true);
        ranked
    }

    /// Most operations of any kind seen in one window, this call included.
    ///
    /// `None` uses a 30 second window.
    pub fn windowed_peak_load(&self, window_secs: Option<u64>) -> usize {
        let start = Instant::now();
        self.ledger.record(None);
        let window = window_secs.unwrap_or(DEFAULT_PEAK_WINDOW_SECS);
        let peak = self
            .ledger
            .inspect(|s| analytics::windowed_peak_load(&s.all_timestamps, window));
        record_request("windowed_peak_load", start, true);
        peak
    }

    /// Shortest link path from `from` to `to`, or `Timeout` once `deadline`
    /// elapses.
    #[instrument(skip(self), fields(operation = "shortest_path"))]
    pub async fn shortest_path(
        &self,
        from: &str,
        to: &str,
        deadline: Duration,
    ) -> Result<Vec<String>> {
        let start = Instant::now();
        self.ledger.record(None);
        let result = self.path_finder.search(from, to, deadline).await;
        record_request("shortest_path", start, result.is_ok());
        result
    }

    /// Persist the ledger to the configured store. A no-op without one.
    pub fn flush(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.persist(&self.ledger.snapshot()),
            None => Ok(()),
        }
    }

    /// The shared request ledger.
    pub fn ledger(&self) -> &Arc<RequestLedger> {
        &self.ledger
    }

    /// The page cache.
    pub fn cache(&self) -> &BoundedCache<CachedPage> {
        &self.cache
    }

    /// Name of the underlying content source.
    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}

/// Record request outcome metrics (counter + histogram).
fn record_request(operation: &'static str, start: Instant, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::REQUESTS_TOTAL,
        "operation" => operation,
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
        "operation" => operation,
    )
    .record(start.elapsed().as_secs_f64());
}
