//! paragliding-tracker library interface
//!
//! Exposes the services and router for the binary and integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::{IngestionService, TickerService, WebhookNotifier};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub ingestion: Arc<IngestionService>,
    pub ticker: TickerService,
    pub webhooks: WebhookNotifier,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        ingestion: IngestionService,
        ticker: TickerService,
        webhooks: WebhookNotifier,
    ) -> Self {
        Self {
            db,
            ingestion: Arc::new(ingestion),
            ticker,
            webhooks,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::info_routes())
        .merge(api::track_routes())
        .merge(api::ticker_routes())
        .merge(api::webhook_routes())
        .merge(api::admin_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
