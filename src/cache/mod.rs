//! Caching subsystem.
//!
//! Two independent caches:
//!
//! - [`BoundedCache`]: capacity- and age-bounded store of
//!   [`Cacheable`] values with an exact eviction contract. The mediator
//!   keeps fetched page text here as [`CachedPage`]s.
//!
//! - [`search::SearchCache`]: opt-in TTL cache for title search results.
//!   Activated via the builder's `.search_cache()` method.

pub mod bounded;
pub mod search;

pub use bounded::{BoundedCache, CacheConfig, Cacheable, CachedPage};
pub use search::{SearchCache, SearchCacheConfig};
