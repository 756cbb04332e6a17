//! Track store
//!
//! Records are insert-only. Uniqueness of `url` and `id` is enforced by the
//! schema, so racing submissions resolve inside SQLite rather than here.

use chrono::{DateTime, Utc};
use paragliding_common::db::{TrackRecord, TRACKS_INGESTED_COUNTER};
use paragliding_common::time::{from_millis, to_millis};
use paragliding_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::counters;
use crate::db::webhooks::{self, FiredWebhook};

const TRACK_COLUMNS: &str =
    "id, url, pilot, glider, glider_id, h_date, track_length, timestamp_ms";

/// A committed track and the webhook batches it completed
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTrack {
    /// Ingestion timestamp actually persisted
    pub timestamp: DateTime<Utc>,
    pub fired: Vec<FiredWebhook>,
}

/// Result of an insert attempt
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(StoredTrack),
    /// Another record already holds this url
    DuplicateUrl,
    /// Another record already holds this id
    DuplicateId,
}

/// Insert a track unless its url or id is already taken.
///
/// One transaction covers the row, the ingested-tracks counter and every
/// webhook's pending batch; any failure leaves all three untouched.
///
/// The stored timestamp is `max(record.timestamp, newest stored + 1ms)` so
/// ingestion timestamps are strictly increasing even within one millisecond.
pub async fn insert_track(pool: &SqlitePool, record: &TrackRecord) -> Result<InsertOutcome> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO tracks (id, url, pilot, glider, glider_id, h_date, track_length, timestamp_ms)
        VALUES (?, ?, ?, ?, ?, ?, ?,
                MAX(?, COALESCE((SELECT MAX(timestamp_ms) FROM tracks), -1) + 1))
        RETURNING timestamp_ms
        "#,
    )
    .bind(&record.id)
    .bind(&record.url)
    .bind(&record.pilot)
    .bind(&record.glider)
    .bind(&record.glider_id)
    .bind(&record.h_date)
    .bind(record.track_length)
    .bind(to_millis(record.timestamp))
    .fetch_one(&mut *tx)
    .await;

    let millis = match result {
        Ok(millis) => millis,
        Err(err) => {
            return match unique_violation_column(&err) {
                Some(column) if column.ends_with("tracks.url") => Ok(InsertOutcome::DuplicateUrl),
                Some(column) if column.ends_with("tracks.id") => Ok(InsertOutcome::DuplicateId),
                _ => Err(err.into()),
            };
        }
    };
    let timestamp = from_millis(millis)?;

    counters::increment(&mut *tx, TRACKS_INGESTED_COUNTER).await?;
    let fired = webhooks::record_track_added(&mut tx, &record.id, timestamp).await?;

    tx.commit().await?;

    Ok(InsertOutcome::Inserted(StoredTrack { timestamp, fired }))
}

/// Column named by a UNIQUE violation, e.g. `tracks.url`
fn unique_violation_column(err: &sqlx::Error) -> Option<String> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    // SQLite: "UNIQUE constraint failed: tracks.url"
    db_err
        .message()
        .rsplit(':')
        .next()
        .map(|s| s.trim().to_string())
}

/// Load track by id
pub async fn load_track_by_id(pool: &SqlitePool, id: &str) -> Result<Option<TrackRecord>> {
    let row = sqlx::query(&format!("SELECT {} FROM tracks WHERE id = ?", TRACK_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_track).transpose()
}

/// Load track by exact source url (no normalization)
pub async fn load_track_by_url(pool: &SqlitePool, url: &str) -> Result<Option<TrackRecord>> {
    let row = sqlx::query(&format!("SELECT {} FROM tracks WHERE url = ?", TRACK_COLUMNS))
        .bind(url)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_track).transpose()
}

/// Load all tracks, oldest first
pub async fn load_all_tracks(pool: &SqlitePool) -> Result<Vec<TrackRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tracks ORDER BY timestamp_ms, id",
        TRACK_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_track).collect()
}

/// (id, ingestion timestamp) pairs, oldest first
pub async fn load_track_timestamps(pool: &SqlitePool) -> Result<Vec<(String, DateTime<Utc>)>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT id, timestamp_ms FROM tracks ORDER BY timestamp_ms, id")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|(id, millis)| Ok((id, from_millis(millis)?)))
        .collect()
}

/// Count stored tracks
pub async fn count_tracks(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM tracks")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Delete every track and reset ingestion bookkeeping.
///
/// Resets the ingested-tracks counter and every webhook's pending batch. The
/// id counter is left alone so ids are never reused. Returns the number of
/// tracks removed.
pub async fn delete_all_tracks(pool: &SqlitePool) -> Result<u64> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM tracks")
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("UPDATE counters SET value = 0 WHERE name = ?")
        .bind(TRACKS_INGESTED_COUNTER)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM webhook_pending")
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE webhooks SET pending_count = 0, window_start_ms = NULL")
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(deleted)
}

fn row_to_track(row: &SqliteRow) -> Result<TrackRecord> {
    Ok(TrackRecord {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        pilot: row.try_get("pilot")?,
        glider: row.try_get("glider")?,
        glider_id: row.try_get("glider_id")?,
        h_date: row.try_get("h_date")?,
        track_length: row.try_get("track_length")?,
        timestamp: from_millis(row.try_get("timestamp_ms")?)?,
    })
}
