//! Webhook subscription endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use paragliding_common::db::WebhookSubscription;
use serde::{Deserialize, Serialize};

use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterWebhookRequest {
    #[serde(rename = "webhookURL")]
    pub webhook_url: String,
    #[serde(rename = "minTriggerValue", default)]
    pub min_trigger_value: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterWebhookResponse {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    #[serde(rename = "webhookURL")]
    pub webhook_url: String,
    #[serde(rename = "minTriggerValue")]
    pub min_trigger_value: i64,
}

impl From<WebhookSubscription> for WebhookResponse {
    fn from(sub: WebhookSubscription) -> Self {
        Self {
            webhook_url: sub.callback_url,
            min_trigger_value: sub.trigger_count,
        }
    }
}

/// POST /paragliding/api/webhook/new_track
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterWebhookRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterWebhookResponse>)> {
    let Json(request) = payload?;
    let sub = state
        .webhooks
        .register(&request.webhook_url, request.min_trigger_value)
        .await?;
    Ok((StatusCode::CREATED, Json(RegisterWebhookResponse { id: sub.id })))
}

/// GET /paragliding/api/webhook/new_track/:id
pub async fn get_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<WebhookResponse>> {
    Ok(Json(state.webhooks.find(&id).await?.into()))
}

/// DELETE /paragliding/api/webhook/new_track/:id
pub async fn delete_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<WebhookResponse>> {
    Ok(Json(state.webhooks.unregister(&id).await?.into()))
}

/// Build webhook routes
pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/paragliding/api/webhook/new_track", post(register))
        .route("/paragliding/api/webhook/new_track/", post(register))
        .route(
            "/paragliding/api/webhook/new_track/:id",
            get(get_webhook).delete(delete_webhook),
        )
}
