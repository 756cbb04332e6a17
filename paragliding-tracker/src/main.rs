//! paragliding-tracker - flight track record service
//!
//! Ingests IGC track files by URL, serves their metadata, pages through
//! ingestions with a ticker and notifies webhook subscribers.

use anyhow::{Context, Result};
use clap::Parser;
use paragliding_common::config::{ConfigOverrides, IdStrategy, ServiceConfig};
use paragliding_common::db::init_database;
use paragliding_tracker::services::webhook_notifier::notification_client;
use paragliding_tracker::services::{
    allocator_for, HttpTrackParser, IngestionService, TickerService, WebhookNotifier,
};
use paragliding_tracker::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_LOG_FILTER: &str = "paragliding_tracker=info,paragliding_common=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "paragliding-tracker")]
#[command(about = "Flight track record service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "PARAGLIDING_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "PARAGLIDING_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PARAGLIDING_PORT")]
    port: Option<u16>,

    /// Folder holding the database
    #[arg(short, long, env = "PARAGLIDING_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Explicit database file
    #[arg(long, env = "PARAGLIDING_DATABASE")]
    database: Option<PathBuf>,

    /// Track id strategy (counter | uuid)
    #[arg(long, env = "PARAGLIDING_ID_STRATEGY")]
    id_strategy: Option<IdStrategy>,

    /// Maximum ids per ticker page
    #[arg(long, env = "PARAGLIDING_TICKER_PAGE_SIZE")]
    ticker_page_size: Option<usize>,

    /// Log filter, used when RUST_LOG is unset
    #[arg(long, env = "PARAGLIDING_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let fallback_filter = args
        .log_level
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting paragliding-tracker v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = ServiceConfig::load(args.config.as_deref())?.apply(ConfigOverrides {
        host: args.host,
        port: args.port,
        root_folder: args.root_folder,
        database_path: args.database,
        id_strategy: args.id_strategy,
        ticker_page_size: args.ticker_page_size,
    })?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let parser = HttpTrackParser::new(Duration::from_millis(config.fetch_timeout_ms))
        .context("Failed to build track fetch client")?;
    let webhook_client = notification_client(Duration::from_millis(config.webhook_timeout_ms))?;

    let (notifier, dispatcher) = WebhookNotifier::spawn(
        pool.clone(),
        webhook_client,
        config.webhook_queue_capacity,
    );

    let ingestion = IngestionService::new(
        pool.clone(),
        Arc::new(parser),
        allocator_for(config.id_strategy, pool.clone()),
        notifier.clone(),
        config.db_lock_wait_ms,
    );
    let ticker = TickerService::new(pool.clone(), config.ticker_page_size);

    info!(
        id_strategy = ?config.id_strategy,
        ticker_page_size = ?config.ticker_page_size,
        "Services initialized"
    );

    let state = AppState::new(pool.clone(), ingestion, ticker, notifier);
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("paragliding-tracker listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router and its notifier handles are gone, so the queue is closed
    let drain_wait = Duration::from_millis(config.webhook_timeout_ms.saturating_mul(2));
    match tokio::time::timeout(drain_wait, dispatcher).await {
        Ok(Ok(())) => info!("✓ Pending webhook deliveries finished"),
        Ok(Err(e)) => warn!("Webhook dispatcher failed: {}", e),
        Err(_) => warn!("Gave up on pending webhook deliveries after {:?}", drain_wait),
    }

    pool.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
