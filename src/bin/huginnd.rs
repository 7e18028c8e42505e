//! huginnd: Huginn daemon.
//!
//! Serves a [`Mediator`](huginn::Mediator) over line-oriented JSON on TCP.
//! The request ledger is loaded at startup and written back when a client
//! sends `stop` or the process receives Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use huginn::server::HuginnService;
use huginn::server::config::Config;
use huginn::{Huginn, HuginnError, JsonFileStore, Mediator};

/// Huginn daemon: caching wiki mediator.
#[derive(Parser)]
#[command(name = "huginnd")]
#[command(version)]
#[command(about = "Huginn wiki mediator daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "HUGINN_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Address to bind to, overriding the configuration file.
    #[arg(short, long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(address) = args.address {
        config.server.address = address;
    }

    let mediator = Arc::new(build_mediator(&config)?);

    // Parse address
    let addr: SocketAddr = config
        .server
        .address
        .parse()
        .map_err(|e| HuginnError::Configuration(format!("Invalid address: {e}")))?;
    let listener = TcpListener::bind(addr).await?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        %addr,
        source = mediator.source_name(),
        "huginnd starting"
    );

    let service = HuginnService::new(Arc::clone(&mediator)).limits(config.server.limits.clone());
    tokio::select! {
        result = service.serve(listener) => result?,
        _ = tokio::signal::ctrl_c() => info!("interrupt received"),
    }

    if let Err(e) = mediator.flush() {
        error!(error = %e, "failed to persist request ledger");
        return Err(e.into());
    }
    info!("huginnd stopped");
    Ok(())
}

/// Build a [`Mediator`] from configuration.
fn build_mediator(config: &Config) -> huginn::Result<Mediator> {
    let mut builder = Huginn::builder()
        .wiki(config.wiki_config())
        .cache(config.cache_config())
        .retry(config.retry_config())
        .max_concurrent_fetches(config.path.max_concurrent_fetches)
        .ledger_store(Arc::new(JsonFileStore::new(config.ledger_path())));

    if let Some(search) = config.search_cache_config() {
        builder = builder.search_cache(search);
    }

    builder.build()
}
