//! Administrative endpoints

use axum::{
    extract::State,
    routing::{delete, get},
    Router,
};
use tracing::info;

use crate::db::tracks;
use crate::{ApiResult, AppState};

/// GET /paragliding/admin/api/tracks_count
pub async fn tracks_count(State(state): State<AppState>) -> ApiResult<String> {
    let count = tracks::count_tracks(&state.db).await?;
    Ok(count.to_string())
}

/// DELETE /paragliding/admin/api/tracks
///
/// Removes every track and resets the ingestion counter and pending webhook
/// batches. Track ids keep counting up afterwards.
pub async fn delete_all_tracks(State(state): State<AppState>) -> ApiResult<String> {
    let deleted = tracks::delete_all_tracks(&state.db).await?;
    info!(deleted, "Deleted all tracks");
    Ok(deleted.to_string())
}

/// Build admin routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/paragliding/admin/api/tracks_count", get(tracks_count))
        .route("/paragliding/admin/api/tracks", delete(delete_all_tracks))
}
