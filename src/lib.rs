//! Huginn - caching, usage-tracking mediator for wiki content
//!
//! This crate sits between clients and a wiki. It serves page text through
//! a capacity- and age-bounded cache, records every request in an
//! append-only ledger that drives popularity and load analytics, and finds
//! shortest link paths between pages under a deadline.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use huginn::{CacheConfig, Huginn, WikiConfig};
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let mediator = Huginn::builder()
//!         .wiki(WikiConfig::default())
//!         .cache(CacheConfig::new().capacity(64))
//!         .build()?;
//!
//!     let text = mediator.get_page("Rust (programming language)").await?;
//!     println!("{} bytes", text.len());
//!
//!     let path = mediator
//!         .shortest_path("Rust", "Iron", Duration::from_secs(30))
//!         .await?;
//!     println!("{}", path.join(" -> "));
//!
//!     println!("popular: {:?}", mediator.zeitgeist(5));
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod clock;
pub mod error;
pub mod ledger;
pub mod mediator;
pub mod path;
#[cfg(feature = "server")]
pub mod server;
pub mod source;
pub mod telemetry;

// Re-export main types at crate root
pub use error::{HuginnError, Result};
pub use mediator::{Huginn, HuginnBuilder, Mediator};

pub use cache::{BoundedCache, CacheConfig, Cacheable, CachedPage, SearchCacheConfig};
pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use ledger::store::{JsonFileStore, LedgerStore};
pub use ledger::{KeyHistory, LedgerSnapshot, RequestLedger};
pub use path::PathFinder;
pub use source::{ContentSource, RetryConfig, RetryingContentSource, WikiClient, WikiConfig};
