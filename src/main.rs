use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slug_proxy::config::{load_config, ProxyConfig};
use slug_proxy::http::HttpServer;
use slug_proxy::store::RedisStore;

#[derive(Parser)]
#[command(name = "slug-proxy", about = "Multi-tenant slug proxy", version)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    // RUST_LOG wins over the configured level.
    let default_filter = format!(
        "slug_proxy={},tower_http={}",
        config.observability.log_level, config.observability.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "slug-proxy starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        store_url = %config.store.url,
        entry_suffix = %config.upstream.entry_suffix,
        rate_limit_enabled = config.rate_limit.enabled,
        "Configuration loaded"
    );

    let store = RedisStore::connect(&config.store.url).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let server = HttpServer::new(config, Arc::new(store))?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
