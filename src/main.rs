use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rss_middletier::api::{self, AppState};
use rss_middletier::config::{Config, LogFormat, StoreBackend};
use rss_middletier::feed::FeedFetcher;
use rss_middletier::service::FeedService;
use rss_middletier::storage;

#[derive(Parser, Debug)]
#[command(
    name = "rss-middletier",
    about = "Per-user RSS subscriptions and aggregated feed contents over HTTP"
)]
struct Args {
    /// Path to the TOML config file (missing file means defaults)
    #[arg(long, value_name = "FILE", default_value = "middletier.toml")]
    config: PathBuf,

    /// Listen address, overrides config and MIDDLETIER_BIND
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Subscription store backend, overrides config
    #[arg(long, value_enum)]
    backend: Option<StoreBackend>,

    /// Log output format, overrides config
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rss_middletier=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    config.apply_env();
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(backend) = args.backend {
        config.store.backend = backend;
    }
    if let Some(format) = args.log_format {
        config.log.format = format;
    }

    init_tracing(config.log.format);
    tracing::info!(
        config = %args.config.display(),
        backend = ?config.store.backend,
        nodes = ?config.store.nodes,
        "Starting rss-middletier"
    );

    let store = storage::open_store(&config.store)
        .await
        .context("Failed to open subscription store")?;
    let fetcher = FeedFetcher::new(&config.fetch).context("Failed to build HTTP client")?;
    let service = FeedService::new(store, fetcher, config.fetch.concurrency);
    let state = AppState::new(service)
        .with_url_checks(config.fetch.validate_urls, config.fetch.block_private_hosts);
    let app = api::router(state);

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;
    tracing::info!(addr = %config.server.bind, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
