//! Deadline-bound shortest path search over the wiki link graph.
//!
//! [`PathFinder`] runs a breadth-first search whose edges are discovered on
//! demand through a [`ContentSource`]. Each layer fetches the links of every
//! frontier node in parallel (bounded by a semaphore), then joins before the
//! next layer starts.
//!
//! # Result
//!
//! The first layer that reaches the target ends the search. Among the
//! minimum-hop paths found in that layer, the lexicographically smallest
//! node sequence wins.
//!
//! # Cancellation
//!
//! The whole search runs under the caller's deadline. When it elapses, or
//! the search future is dropped by an outer timeout, a shared flag is
//! raised: queued fetches see it and never start, while a fetch already
//! sent upstream is left to finish in the background. The caller gets
//! [`HuginnError::Timeout`], never a partial path.
//!
//! A fetch in flight runs to completion through whatever wraps the source,
//! so a [`RetryingContentSource`](crate::RetryingContentSource) underneath
//! may still retry it after the flag is raised.
//!
//! There is no separate "no path" outcome. A frontier that runs dry is
//! reported as `Timeout` straight away.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::source::ContentSource;
use crate::telemetry;
use crate::{HuginnError, Result};

/// Default number of link fetches allowed in flight per search.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// Node identifier to the smallest path reaching it in the current layer.
type Frontier = BTreeMap<String, Vec<String>>;

/// Breadth-first path search over a [`ContentSource`]. See module docs.
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use std::time::Duration;
/// # use huginn::{PathFinder, WikiClient};
/// # async fn example() -> huginn::Result<()> {
/// let finder = PathFinder::new(Arc::new(WikiClient::new()?)).max_concurrent_fetches(4);
/// let path = finder.search("Rust", "Iron", Duration::from_secs(30)).await?;
/// assert_eq!(path.first().map(String::as_str), Some("Rust"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PathFinder {
    source: Arc<dyn ContentSource>,
    max_concurrent_fetches: usize,
}

impl PathFinder {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            source,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    /// Bound on parallel link fetches within one layer (at least 1).
    pub fn max_concurrent_fetches(mut self, n: usize) -> Self {
        self.max_concurrent_fetches = n.max(1);
        self
    }

    /// Find the shortest path from `start` to `target` within `deadline`.
    ///
    /// Returns the full node sequence including both endpoints. Upstream
    /// failures propagate as-is and stop the search.
    pub async fn search(
        &self,
        start: &str,
        target: &str,
        deadline: Duration,
    ) -> Result<Vec<String>> {
        if start == target {
            return Ok(vec![start.to_owned()]);
        }

        let cancel = CancelOnDrop::new();
        let outcome =
            tokio::time::timeout(deadline, self.expand(start, target, &cancel.flag)).await;
        let result = outcome.unwrap_or_else(|_| {
            warn!(
                start,
                target,
                deadline_ms = deadline.as_millis() as u64,
                "path search deadline elapsed"
            );
            Err(HuginnError::Timeout)
        });
        if matches!(result, Err(HuginnError::Timeout)) {
            metrics::counter!(telemetry::PATH_SEARCH_TIMEOUTS_TOTAL).increment(1);
        }
        result
    }

    async fn expand(
        &self,
        start: &str,
        target: &str,
        cancel: &Arc<AtomicBool>,
    ) -> Result<Vec<String>> {
        let permits = Arc::new(Semaphore::new(self.max_concurrent_fetches));
        let mut visited: HashSet<String> = HashSet::from([start.to_owned()]);
        let mut frontier = Frontier::from([(start.to_owned(), vec![start.to_owned()])]);
        let mut layer: u64 = 0;

        while !frontier.is_empty() {
            layer += 1;
            debug!(layer, frontier = frontier.len(), "expanding path search layer");

            // Detached tasks: a fetch already sent keeps running if this
            // future is dropped at the deadline.
            let fetches: Vec<_> = frontier
                .keys()
                .map(|node| self.spawn_fetch(node.clone(), &permits, cancel))
                .collect();

            let mut terminals: Vec<Vec<String>> = Vec::new();
            let mut next = Frontier::new();
            for (path, fetch) in frontier.values().zip(fetches) {
                let links = match fetch.await {
                    Ok(Ok(links)) => links,
                    Ok(Err(e)) => return Err(e),
                    Err(e) => {
                        return Err(HuginnError::UpstreamUnavailable(format!(
                            "link fetch task failed: {e}"
                        )));
                    }
                };
                for link in links {
                    if link == target {
                        let mut found = path.clone();
                        found.push(link);
                        terminals.push(found);
                    } else if !visited.contains(&link) {
                        offer(&mut next, path, link);
                    }
                }
            }

            // Same-length sequences: Vec ordering is the per-position filter.
            if let Some(best) = terminals.into_iter().min() {
                metrics::histogram!(telemetry::PATH_SEARCH_LAYERS).record(layer as f64);
                debug!(layer, hops = best.len() - 1, "path found");
                return Ok(best);
            }

            visited.extend(next.keys().cloned());
            frontier = next;
        }

        metrics::histogram!(telemetry::PATH_SEARCH_LAYERS).record(layer as f64);
        debug!(start, target, layer, "frontier exhausted without reaching target");
        Err(HuginnError::Timeout)
    }

    fn spawn_fetch(
        &self,
        node: String,
        permits: &Arc<Semaphore>,
        cancel: &Arc<AtomicBool>,
    ) -> tokio::task::JoinHandle<Result<Vec<String>>> {
        let source = Arc::clone(&self.source);
        let permits = Arc::clone(permits);
        let cancel = Arc::clone(cancel);
        tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| HuginnError::Timeout)?;
            if cancel.load(Ordering::Acquire) {
                return Err(HuginnError::Timeout);
            }
            source.fetch_links(&node).await
        })
    }
}

/// Shared cancel flag, raised when the owning search returns or is dropped.
struct CancelOnDrop {
    flag: Arc<AtomicBool>,
}

impl CancelOnDrop {
    fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// Add `path + [link]` to the next layer unless a smaller path already
/// reaches `link`.
fn offer(next: &mut Frontier, path: &[String], link: String) {
    match next.get(&link) {
        Some(existing) if existing[..path.len()] <= path[..] => {}
        _ => {
            let mut extended = path.to_vec();
            extended.push(link.clone());
            next.insert(link, extended);
        }
    }
}
