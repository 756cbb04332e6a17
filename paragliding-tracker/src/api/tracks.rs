//! Track submission and lookup endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use paragliding_common::db::TrackRecord;
use serde::{Deserialize, Serialize};

use crate::db::tracks;
use crate::{ApiError, ApiResult, AppState};

/// POST /paragliding/api/track body
#[derive(Debug, Deserialize)]
pub struct SubmitTrackRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTrackResponse {
    pub id: String,
}

/// Track metadata document
#[derive(Debug, Serialize, Deserialize)]
pub struct TrackResponse {
    #[serde(rename = "H_date")]
    pub h_date: String,
    pub pilot: String,
    pub glider: String,
    pub glider_id: String,
    pub track_length: f64,
    pub track_src_url: String,
}

impl From<TrackRecord> for TrackResponse {
    fn from(record: TrackRecord) -> Self {
        Self {
            h_date: record.h_date,
            pilot: record.pilot,
            glider: record.glider,
            glider_id: record.glider_id,
            track_length: record.track_length,
            track_src_url: record.url,
        }
    }
}

/// Plain-text value of one named field.
///
/// Names that are not `[A-Za-z_]+` are rejected; well-formed unknown names
/// are not found.
pub fn track_field(record: &TrackRecord, field: &str) -> ApiResult<String> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
        return Err(ApiError::BadRequest(format!("Malformed field name: {}", field)));
    }

    let value = match field {
        "pilot" => record.pilot.clone(),
        "glider" => record.glider.clone(),
        "glider_id" => record.glider_id.clone(),
        "h_date" | "H_date" => record.h_date.clone(),
        "track_length" => record.track_length.to_string(),
        "track_src_url" => record.url.clone(),
        _ => return Err(ApiError::NotFound(format!("Unknown field: {}", field))),
    };

    Ok(value)
}

/// POST /paragliding/api/track
pub async fn submit_track(
    State(state): State<AppState>,
    payload: Result<Json<SubmitTrackRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitTrackResponse>)> {
    let Json(request) = payload?;
    let record = state.ingestion.submit(&request.url).await?;
    Ok((StatusCode::CREATED, Json(SubmitTrackResponse { id: record.id })))
}

/// GET /paragliding/api/track
pub async fn list_track_ids(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let ids = tracks::load_all_tracks(&state.db)
        .await?
        .into_iter()
        .map(|record| record.id)
        .collect();
    Ok(Json(ids))
}

/// GET /paragliding/api/track/:id
pub async fn get_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TrackResponse>> {
    let record = load(&state, &id).await?;
    Ok(Json(record.into()))
}

/// GET /paragliding/api/track/:id/:field
pub async fn get_track_field(
    State(state): State<AppState>,
    Path((id, field)): Path<(String, String)>,
) -> ApiResult<String> {
    let record = load(&state, &id).await?;
    track_field(&record, &field)
}

async fn load(state: &AppState, id: &str) -> ApiResult<TrackRecord> {
    tracks::load_track_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Track {}", id)))
}

/// Build track routes
pub fn track_routes() -> Router<AppState> {
    Router::new()
        .route("/paragliding/api/track", get(list_track_ids).post(submit_track))
        .route("/paragliding/api/track/:id", get(get_track))
        .route("/paragliding/api/track/:id/:field", get(get_track_field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record() -> TrackRecord {
        TrackRecord {
            id: "7".to_string(),
            url: "http://example.org/track.igc".to_string(),
            pilot: "Miguel Angel Gordillo".to_string(),
            glider: "RV8".to_string(),
            glider_id: "EC-XLL".to_string(),
            h_date: "2016-02-19".to_string(),
            track_length: 443.25,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_known_fields() {
        let r = record();
        assert_eq!(track_field(&r, "pilot").unwrap(), "Miguel Angel Gordillo");
        assert_eq!(track_field(&r, "glider_id").unwrap(), "EC-XLL");
        assert_eq!(track_field(&r, "H_date").unwrap(), "2016-02-19");
        assert_eq!(track_field(&r, "track_length").unwrap(), "443.25");
        assert_eq!(track_field(&r, "track_src_url").unwrap(), r.url);
    }

    #[test]
    fn test_unknown_and_malformed_fields() {
        let r = record();
        assert!(matches!(track_field(&r, "altitude"), Err(ApiError::NotFound(_))));
        assert!(matches!(track_field(&r, "pilot1"), Err(ApiError::BadRequest(_))));
        assert!(matches!(track_field(&r, "pi-lot"), Err(ApiError::BadRequest(_))));
        assert!(matches!(track_field(&r, ""), Err(ApiError::BadRequest(_))));
    }
}
