//! Configuration loading for huginnd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//!
//! An explicit path must exist. Without one, and with neither standard file
//! present, every section takes its defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{CacheConfig, SearchCacheConfig};
use crate::ledger::store::JsonFileStore;
use crate::source::{RetryConfig, WikiConfig};
use crate::{HuginnError, Result};

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub search_cache: Option<SearchCacheSection>,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub path: PathSection,
    #[serde(default)]
    pub storage: StorageSection,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:9012).
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            limits: LimitsConfig::default(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:9012".to_string()
}

/// Resource limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum clients served at once; further connections wait (default: 32).
    #[serde(default = "default_max_clients")]
    pub max_concurrent_clients: usize,
    /// Timeout for requests that carry none of their own (default: 30).
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_clients: default_max_clients(),
            request_timeout_secs: default_timeout(),
        }
    }
}

fn default_max_clients() -> usize {
    32
}

fn default_timeout() -> u64 {
    30
}

/// Page cache bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Seconds a page stays cached after its last use.
    #[serde(default = "default_staleness")]
    pub staleness_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            staleness_secs: default_staleness(),
        }
    }
}

fn default_capacity() -> usize {
    32
}

fn default_staleness() -> u64 {
    3600
}

/// Search result cache; present only when the section is.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchCacheSection {
    #[serde(default = "default_search_entries")]
    pub max_entries: u64,
    #[serde(default = "default_search_ttl")]
    pub ttl_secs: u64,
}

fn default_search_entries() -> u64 {
    1_000
}

fn default_search_ttl() -> u64 {
    600
}

/// Wiki endpoint settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceSection {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Retry policy for the wiki client.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// Path search tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct PathSection {
    #[serde(default = "default_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for PathSection {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_fetches(),
        }
    }
}

fn default_fetches() -> usize {
    crate::path::DEFAULT_MAX_CONCURRENT_FETCHES
}

/// Ledger persistence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSection {
    /// Ledger file (default: `<data dir>/huginn/ledger.json`).
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.huginn/config.toml`
    /// 3. `/etc/huginn/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .capacity(self.cache.capacity)
            .ttl(Duration::from_secs(self.cache.staleness_secs))
    }

    pub fn search_cache_config(&self) -> Option<SearchCacheConfig> {
        self.search_cache.as_ref().map(|section| {
            SearchCacheConfig::new()
                .max_entries(section.max_entries)
                .ttl(Duration::from_secs(section.ttl_secs))
        })
    }

    pub fn wiki_config(&self) -> WikiConfig {
        let mut config = WikiConfig::new();
        if let Some(url) = &self.source.api_url {
            config = config.api_url(url);
        }
        if let Some(agent) = &self.source.user_agent {
            config = config.user_agent(agent);
        }
        if let Some(secs) = self.source.timeout_secs {
            config = config.timeout(Duration::from_secs(secs));
        }
        config
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_attempts(self.retry.max_attempts)
            .initial_delay(Duration::from_millis(self.retry.initial_delay_ms))
            .max_delay(Duration::from_millis(self.retry.max_delay_ms))
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.storage
            .ledger_path
            .clone()
            .unwrap_or_else(JsonFileStore::default_path)
    }
}
