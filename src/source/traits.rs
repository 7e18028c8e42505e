//! Content source trait.
//!
//! The mediator and the path finder reach the remote wiki only through
//! [`ContentSource`]. Implementations may be slow and may fail; transport
//! failures surface as `UpstreamUnavailable` (or `Api` / `RateLimited`
//! when the server answered), never as an empty result.
//!
//! # Example
//!
//! ```ignore
//! // An in-memory source for tests
//! async fn fetch_links(&self, title: &str) -> Result<Vec<String>> {
//!     Ok(self.graph.get(title).cloned().unwrap_or_default())
//! }
//! ```

use async_trait::async_trait;

use crate::Result;

/// Remote source of page text, page links and title search.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Source name for logging/debugging.
    fn name(&self) -> &str;

    /// Full text of the page titled `title`.
    ///
    /// Returns `NotFound` if the page does not exist.
    async fn fetch_text(&self, title: &str) -> Result<String>;

    /// Titles linked from `title`, in source order.
    ///
    /// A page that does not exist has no links.
    async fn fetch_links(&self, title: &str) -> Result<Vec<String>>;

    /// Up to `limit` page titles matching `query`, best match first.
    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<String>>;
}
