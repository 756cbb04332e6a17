//! Webhook subscription store

use chrono::{DateTime, Utc};
use paragliding_common::db::WebhookSubscription;
use paragliding_common::time::{from_millis, to_millis};
use paragliding_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

const WEBHOOK_COLUMNS: &str =
    "id, callback_url, trigger_count, pending_count, window_start_ms, created_at_ms";

/// A subscription whose batch filled up on the latest ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct FiredWebhook {
    pub id: String,
    pub callback_url: String,
    /// Tracks counted in the completed batch
    pub new_tracks: i64,
    pub window_start: DateTime<Utc>,
    pub window_stop: DateTime<Utc>,
    /// Batch members, oldest first
    pub ids: Vec<String>,
}

/// Save a new subscription
pub async fn insert_webhook(pool: &SqlitePool, webhook: &WebhookSubscription) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO webhooks (id, callback_url, trigger_count, pending_count, window_start_ms, created_at_ms)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&webhook.id)
    .bind(&webhook.callback_url)
    .bind(webhook.trigger_count)
    .bind(webhook.pending_count)
    .bind(webhook.window_start.map(to_millis))
    .bind(to_millis(webhook.created_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load subscription by id
pub async fn load_webhook(pool: &SqlitePool, id: &str) -> Result<Option<WebhookSubscription>> {
    let row = sqlx::query(&format!("SELECT {} FROM webhooks WHERE id = ?", WEBHOOK_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_webhook).transpose()
}

/// Load all subscriptions, oldest registration first
pub async fn load_all_webhooks(pool: &SqlitePool) -> Result<Vec<WebhookSubscription>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM webhooks ORDER BY created_at_ms, id",
        WEBHOOK_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_webhook).collect()
}

/// Delete subscription; returns false when it did not exist
pub async fn delete_webhook(pool: &SqlitePool, id: &str) -> Result<bool> {
    let affected = sqlx::query("DELETE FROM webhooks WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

/// Count one new track against every subscription.
///
/// Must run inside the transaction that inserts the track, so a rolled back
/// insert is never counted. Each subscription's batch membership lives in
/// `webhook_pending`; a fired batch reports exactly its own track ids and its
/// window spans the earliest to the latest of them.
pub async fn record_track_added(
    conn: &mut SqliteConnection,
    track_id: &str,
    timestamp: DateTime<Utc>,
) -> Result<Vec<FiredWebhook>> {
    let ts = to_millis(timestamp);

    sqlx::query("INSERT INTO webhook_pending (webhook_id, track_id, timestamp_ms) SELECT id, ?, ? FROM webhooks")
        .bind(track_id)
        .bind(ts)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        UPDATE webhooks
        SET pending_count = pending_count + 1,
            window_start_ms = MIN(COALESCE(window_start_ms, ?), ?)
        "#,
    )
    .bind(ts)
    .bind(ts)
    .execute(&mut *conn)
    .await?;

    let due: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT id, callback_url
        FROM webhooks
        WHERE pending_count >= trigger_count
        ORDER BY created_at_ms, id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut fired = Vec::with_capacity(due.len());
    for (id, callback_url) in due {
        let batch: Vec<(String, i64)> = sqlx::query_as(
            "SELECT track_id, timestamp_ms FROM webhook_pending WHERE webhook_id = ? ORDER BY timestamp_ms, track_id",
        )
        .bind(&id)
        .fetch_all(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM webhook_pending WHERE webhook_id = ?")
            .bind(&id)
            .execute(&mut *conn)
            .await?;

        sqlx::query("UPDATE webhooks SET pending_count = 0, window_start_ms = NULL WHERE id = ?")
            .bind(&id)
            .execute(&mut *conn)
            .await?;

        let start_ms = batch.first().map_or(ts, |(_, ms)| *ms);
        let stop_ms = batch.last().map_or(ts, |(_, ms)| *ms);

        fired.push(FiredWebhook {
            id,
            callback_url,
            new_tracks: batch.len() as i64,
            window_start: from_millis(start_ms)?,
            window_stop: from_millis(stop_ms)?,
            ids: batch.into_iter().map(|(track_id, _)| track_id).collect(),
        });
    }

    Ok(fired)
}

fn row_to_webhook(row: &SqliteRow) -> Result<WebhookSubscription> {
    let window_start: Option<i64> = row.try_get("window_start_ms")?;

    Ok(WebhookSubscription {
        id: row.try_get("id")?,
        callback_url: row.try_get("callback_url")?,
        trigger_count: row.try_get("trigger_count")?,
        pending_count: row.try_get("pending_count")?,
        window_start: window_start.map(from_millis).transpose()?,
        created_at: from_millis(row.try_get("created_at_ms")?)?,
    })
}
