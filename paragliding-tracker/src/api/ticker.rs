//! Ticker endpoints
//!
//! Timestamps are Unix milliseconds. An empty store answers 204.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use paragliding_common::time::to_millis;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::services::Ticker;
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct TickerResponse {
    pub t_latest: i64,
    pub t_start: i64,
    pub t_stop: i64,
    pub tracks: Vec<String>,
    /// Query time in milliseconds
    pub processing: u64,
}

impl TickerResponse {
    fn new(ticker: Ticker, started: Instant) -> Self {
        Self {
            t_latest: to_millis(ticker.latest),
            t_start: to_millis(ticker.start),
            t_stop: to_millis(ticker.stop),
            tracks: ticker.ids,
            processing: started.elapsed().as_millis() as u64,
        }
    }
}

/// GET /paragliding/api/ticker/latest
pub async fn latest(State(state): State<AppState>) -> ApiResult<Response> {
    Ok(match state.ticker.latest().await? {
        Some(ts) => to_millis(ts).to_string().into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// GET /paragliding/api/ticker
pub async fn ticker(State(state): State<AppState>) -> ApiResult<Response> {
    page(&state, None).await
}

/// GET /paragliding/api/ticker/:timestamp
pub async fn ticker_since(
    State(state): State<AppState>,
    Path(since): Path<String>,
) -> ApiResult<Response> {
    page(&state, Some(since.as_str())).await
}

async fn page(state: &AppState, since: Option<&str>) -> ApiResult<Response> {
    let started = Instant::now();
    Ok(match state.ticker.ticker(since).await? {
        Some(ticker) => Json(TickerResponse::new(ticker, started)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// Build ticker routes
pub fn ticker_routes() -> Router<AppState> {
    Router::new()
        .route("/paragliding/api/ticker", get(ticker))
        .route("/paragliding/api/ticker/", get(ticker))
        .route("/paragliding/api/ticker/latest", get(latest))
        .route("/paragliding/api/ticker/:timestamp", get(ticker_since))
}
