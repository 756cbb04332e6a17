//! Service information and health endpoints

use axum::{extract::State, response::Redirect, routing::get, Json, Router};
use chrono::Utc;
use paragliding_common::db::TRACKS_INGESTED_COUNTER;
use paragliding_common::time::format_iso8601_duration;
use serde::Serialize;

use crate::db::counters;
use crate::{ApiResult, AppState};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("paragliding-tracker")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Tracks ingested since the last delete-all
    pub tracks_ingested: i64,
}

/// API information document
#[derive(Debug, Serialize)]
pub struct ApiInfo {
    /// ISO 8601 duration since service start
    pub uptime: String,
    pub info: String,
    pub version: String,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let tracks_ingested = counters::get(&state.db, TRACKS_INGESTED_COUNTER).await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        module: "paragliding-tracker".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        tracks_ingested,
    }))
}

/// GET /paragliding/api
pub async fn api_info(State(state): State<AppState>) -> Json<ApiInfo> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);

    Json(ApiInfo {
        uptime: format_iso8601_duration(uptime),
        info: "Service for Paragliding tracks.".to_string(),
        version: "v1".to_string(),
    })
}

/// GET /paragliding
pub async fn root_redirect() -> Redirect {
    Redirect::to("/paragliding/api")
}

/// Build information routes
pub fn info_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/paragliding", get(root_redirect))
        .route("/paragliding/", get(root_redirect))
        .route("/paragliding/api", get(api_info))
}
