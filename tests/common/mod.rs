//! Shared in-memory content source for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use huginn::{ContentSource, HuginnError, Result};

/// A fixed link graph with optional latency and failing nodes.
#[derive(Default)]
pub struct GraphSource {
    links: HashMap<String, Vec<String>>,
    pages: HashMap<String, String>,
    search: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    latency: Duration,
    pub link_fetches: AtomicUsize,
    pub text_fetches: AtomicUsize,
    pub search_calls: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl GraphSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(mut self, from: &str, to: &[&str]) -> Self {
        self.links
            .insert(from.to_string(), to.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn page(mut self, title: &str, text: &str) -> Self {
        self.pages.insert(title.to_string(), text.to_string());
        self
    }

    pub fn search_result(mut self, query: &str, titles: &[&str]) -> Self {
        self.search.insert(
            query.to_string(),
            titles.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// Link fetches for `node` fail with `UpstreamUnavailable`.
    pub fn failing(mut self, node: &str) -> Self {
        self.failing.insert(node.to_string());
        self
    }

    /// Every call sleeps this long before answering.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn link_fetch_count(&self) -> usize {
        self.link_fetches.load(Ordering::SeqCst)
    }

    pub fn text_fetch_count(&self) -> usize {
        self.text_fetches.load(Ordering::SeqCst)
    }

    pub fn search_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Nodes whose links were requested, in request order.
    pub fn fetched_nodes(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl ContentSource for GraphSource {
    fn name(&self) -> &str {
        "graph"
    }

    async fn fetch_text(&self, title: &str) -> Result<String> {
        self.text_fetches.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.pages
            .get(title)
            .cloned()
            .ok_or_else(|| HuginnError::NotFound(title.to_string()))
    }

    async fn fetch_links(&self, title: &str) -> Result<Vec<String>> {
        self.link_fetches.fetch_add(1, Ordering::SeqCst);
        self.fetched.lock().unwrap().push(title.to_string());
        self.delay().await;
        if self.failing.contains(title) {
            return Err(HuginnError::UpstreamUnavailable(format!(
                "links for {title}"
            )));
        }
        Ok(self.links.get(title).cloned().unwrap_or_default())
    }

    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(self
            .search
            .get(query)
            .map(|titles| titles.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
