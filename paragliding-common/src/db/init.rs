//! Database initialization
//!
//! Creates the SQLite file on first run and brings the schema up to date.
//! All statements are idempotent, so this is safe to run on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// SQLite busy timeout applied to every pooled connection
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Counter holding the last allocated numeric track id
pub const TRACK_ID_COUNTER: &str = "track_id";

/// Counter of tracks ingested since the last delete-all
pub const TRACKS_INGESTED_COUNTER: &str = "tracks_ingested";

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Per-connection settings: WAL lets readers proceed while one writer commits,
    // busy_timeout makes concurrent writers queue instead of failing outright
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_tracks_table(&pool).await?;
    create_webhooks_table(&pool).await?;
    create_counters_table(&pool).await?;

    Ok(pool)
}

async fn create_tracks_table(pool: &SqlitePool) -> Result<()> {
    // url UNIQUE is the dedup backstop for concurrent submissions of one URL
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id TEXT PRIMARY KEY,
            url TEXT NOT NULL UNIQUE,
            pilot TEXT NOT NULL,
            glider TEXT NOT NULL,
            glider_id TEXT NOT NULL,
            h_date TEXT NOT NULL,
            track_length REAL NOT NULL,
            timestamp_ms INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tracks_timestamp ON tracks(timestamp_ms)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_webhooks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS webhooks (
            id TEXT PRIMARY KEY,
            callback_url TEXT NOT NULL,
            trigger_count INTEGER NOT NULL CHECK (trigger_count > 0),
            pending_count INTEGER NOT NULL DEFAULT 0,
            window_start_ms INTEGER,
            created_at_ms INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Tracks counted toward each subscription's current batch. A track is in
    // at most one batch per subscription, so fired payloads never overlap.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS webhook_pending (
            webhook_id TEXT NOT NULL REFERENCES webhooks(id) ON DELETE CASCADE,
            track_id TEXT NOT NULL,
            timestamp_ms INTEGER NOT NULL,
            PRIMARY KEY (webhook_id, track_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_counters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS counters (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for name in [TRACK_ID_COUNTER, TRACKS_INGESTED_COUNTER] {
        sqlx::query("INSERT OR IGNORE INTO counters (name, value) VALUES (?, 0)")
            .bind(name)
            .execute(pool)
            .await?;
    }

    Ok(())
}
