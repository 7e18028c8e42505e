//! MediaWiki action API client.
//!
//! Talks to a wiki's `api.php` endpoint (English Wikipedia by default):
//!
//! - page text via `action=parse&prop=wikitext`
//! - outbound article links via `prop=links`, restricted to the main
//!   namespace and following `plcontinue` until exhausted
//! - title search via `list=search`
//!
//! All requests ask for `formatversion=2` JSON.
//! See: <https://www.mediawiki.org/wiki/API:Main_page>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::traits::ContentSource;
use crate::{HuginnError, Result};

/// Default API endpoint.
pub const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";

/// Wikimedia asks API clients to identify themselves.
pub const DEFAULT_USER_AGENT: &str = concat!("huginn/", env!("CARGO_PKG_VERSION"));

/// Upper bound the API accepts for `srlimit`.
const MAX_SEARCH_LIMIT: usize = 500;

/// Connection settings for [`WikiClient`].
#[derive(Debug, Clone)]
pub struct WikiConfig {
    /// `api.php` endpoint. Default: English Wikipedia.
    pub api_url: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Per-request timeout. Default: 30s.
    pub timeout: Duration,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl WikiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point at a different `api.php` (another wiki, or a mock server).
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for the MediaWiki action API.
#[derive(Clone)]
pub struct WikiClient {
    http: Client,
    api_url: String,
}

impl WikiClient {
    /// Create a client for English Wikipedia.
    pub fn new() -> Result<Self> {
        Self::with_config(&WikiConfig::default())
    }

    pub fn with_config(config: &WikiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HuginnError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
        })
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<Response> {
        let response = self
            .http
            .get(&self.api_url)
            .query(&[("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await?;
        check_status(response)
    }
}

/// Map HTTP error statuses onto the error taxonomy.
fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(HuginnError::RateLimited { retry_after });
    }
    if status.is_server_error() {
        return Err(HuginnError::UpstreamUnavailable(format!(
            "wiki API returned HTTP {status}"
        )));
    }
    Err(HuginnError::Api {
        status: status.as_u16(),
        message: status.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

impl ApiError {
    fn into_error(self, title: &str) -> HuginnError {
        match self.code.as_str() {
            "missingtitle" | "invalidtitle" => HuginnError::NotFound(title.to_string()),
            "maxlag" | "ratelimited" => HuginnError::RateLimited { retry_after: None },
            _ => HuginnError::Api {
                status: 200,
                message: format!("{}: {}", self.code, self.info),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: Option<ParsedPage>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ParsedPage {
    wikitext: String,
}

#[derive(Debug, Deserialize)]
struct LinksResponse {
    query: Option<LinksQuery>,
    #[serde(rename = "continue")]
    continuation: Option<LinksContinue>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct LinksQuery {
    #[serde(default)]
    pages: Vec<LinksPage>,
}

#[derive(Debug, Deserialize)]
struct LinksPage {
    #[serde(default)]
    links: Vec<TitleEntry>,
}

#[derive(Debug, Deserialize)]
struct LinksContinue {
    plcontinue: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<TitleEntry>,
}

#[derive(Debug, Deserialize)]
struct TitleEntry {
    title: String,
}

#[async_trait]
impl ContentSource for WikiClient {
    fn name(&self) -> &str {
        "wiki"
    }

    async fn fetch_text(&self, title: &str) -> Result<String> {
        let body: ParseResponse = self
            .get(&[("action", "parse"), ("page", title), ("prop", "wikitext")])
            .await?
            .json()
            .await?;
        if let Some(error) = body.error {
            return Err(error.into_error(title));
        }
        body.parse
            .map(|page| page.wikitext)
            .ok_or_else(|| HuginnError::NotFound(title.to_string()))
    }

    async fn fetch_links(&self, title: &str) -> Result<Vec<String>> {
        let mut links = Vec::new();
        let mut next: Option<String> = None;
        loop {
            let mut params = vec![
                ("action", "query"),
                ("prop", "links"),
                ("titles", title),
                ("plnamespace", "0"),
                ("pllimit", "max"),
            ];
            if let Some(token) = next.as_deref() {
                params.push(("plcontinue", token));
            }
            let body: LinksResponse = self.get(&params).await?.json().await?;
            if let Some(error) = body.error {
                return Err(error.into_error(title));
            }
            if let Some(query) = body.query {
                for page in query.pages {
                    links.extend(page.links.into_iter().map(|link| link.title));
                }
            }
            match body.continuation {
                Some(cont) => next = Some(cont.plcontinue),
                None => break,
            }
        }
        debug!(title, count = links.len(), "fetched page links");
        Ok(links)
    }

    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = limit.min(MAX_SEARCH_LIMIT).to_string();
        let body: SearchResponse = self
            .get(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("srprop", ""),
            ])
            .await?
            .json()
            .await?;
        if let Some(error) = body.error {
            return Err(error.into_error(query));
        }
        Ok(body
            .query
            .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }
}
