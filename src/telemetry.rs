//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation`: mediator operation (e.g. "get_page", "shortest_path")
//! - `status`: outcome: "ok" or "error"
//! - `cache`: which cache: "page", "search", or a `CacheConfig` name
//! - `reason`: eviction cause: "expired" or "capacity"

/// Total mediator operations served.
///
/// Labels: `operation`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "huginn_requests_total";

/// Mediator operation duration in seconds.
///
/// Labels: `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "huginn_request_duration_seconds";

/// Total content-source retry attempts (not counting the initial call).
///
/// Labels: `operation`.
pub const RETRIES_TOTAL: &str = "huginn_retries_total";

/// Total cache hits.
///
/// Labels: `cache`.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Total cache misses.
///
/// Labels: `cache`.
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Total entries removed from a bounded cache.
///
/// Labels: `cache`, `reason` ("expired" | "capacity").
pub const CACHE_EVICTIONS_TOTAL: &str = "huginn_cache_evictions_total";

/// BFS layers expanded per path search.
pub const PATH_SEARCH_LAYERS: &str = "huginn_path_search_layers";

/// Path searches that hit their deadline.
pub const PATH_SEARCH_TIMEOUTS_TOTAL: &str = "huginn_path_search_timeouts_total";
