//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ingested flight track. Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub url: String,
    pub pilot: String,
    pub glider: String,
    pub glider_id: String,
    /// Header date as produced by the parser (`YYYY-MM-DD`)
    pub h_date: String,
    /// Kilometres
    pub track_length: f64,
    /// Ingestion time, strictly increasing across the store
    pub timestamp: DateTime<Utc>,
}

/// Registered "notify me every N new tracks" subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub id: String,
    pub callback_url: String,
    pub trigger_count: i64,
    /// Tracks seen since the last notification
    pub pending_count: i64,
    /// Ingestion time of the first track counted in the current batch
    pub window_start: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
