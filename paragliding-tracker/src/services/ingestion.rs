//! Ingestion service
//!
//! Turns a submitted URL into a persisted track record. Dedup is by exact URL
//! string: the lookup before parsing avoids a fetch for known URLs, and the
//! store's UNIQUE(url) constraint settles races between concurrent
//! submissions.

use paragliding_common::time::now;
use paragliding_common::db::{retry_on_lock, TrackRecord};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::tracks::{self, InsertOutcome};
use crate::services::id_allocator::IdAllocator;
use crate::services::track_parser::{ParseError, TrackParser};
use crate::services::webhook_notifier::WebhookNotifier;

/// Allocation attempts before an id collision is reported as internal
pub const MAX_ID_ATTEMPTS: usize = 5;

/// Required (case-insensitive) suffix of a track file path
const TRACK_FILE_SUFFIX: &str = ".igc";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid track URL: {0}")]
    Validation(String),

    /// URL already ingested; carries the existing record's id
    #[error("Track already ingested with id {id}")]
    Conflict { id: String },

    #[error("Failed to parse track: {0}")]
    UpstreamParse(#[from] ParseError),

    #[error("No free track id after {attempts} attempts")]
    IdExhausted { attempts: usize },

    #[error(transparent)]
    Store(#[from] paragliding_common::Error),
}

/// Reject URLs that cannot point at a track file, before any network access
pub fn validate_track_url(url: &str) -> Result<(), IngestError> {
    if url.trim().is_empty() {
        return Err(IngestError::Validation("URL must not be empty".to_string()));
    }

    let parsed = reqwest::Url::parse(url)
        .map_err(|e| IngestError::Validation(format!("'{}': {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(IngestError::Validation(format!(
            "unsupported scheme '{}'",
            parsed.scheme()
        )));
    }

    if !parsed.path().to_ascii_lowercase().ends_with(TRACK_FILE_SUFFIX) {
        return Err(IngestError::Validation(format!(
            "'{}' does not look like a track file",
            url
        )));
    }

    Ok(())
}

pub struct IngestionService {
    db: SqlitePool,
    parser: Arc<dyn TrackParser>,
    ids: Arc<dyn IdAllocator>,
    notifier: WebhookNotifier,
    lock_wait_ms: u64,
}

impl IngestionService {
    pub fn new(
        db: SqlitePool,
        parser: Arc<dyn TrackParser>,
        ids: Arc<dyn IdAllocator>,
        notifier: WebhookNotifier,
        lock_wait_ms: u64,
    ) -> Self {
        Self {
            db,
            parser,
            ids,
            notifier,
            lock_wait_ms,
        }
    }

    /// Submit a track URL.
    ///
    /// Returns the stored record, or `Conflict` with the id already holding
    /// this URL. Nothing is persisted when validation or parsing fails.
    pub async fn submit(&self, url: &str) -> Result<TrackRecord, IngestError> {
        validate_track_url(url)?;

        if let Some(existing) = tracks::load_track_by_url(&self.db, url).await? {
            debug!(url = %url, track_id = %existing.id, "URL already ingested");
            return Err(IngestError::Conflict { id: existing.id });
        }

        let track = self.parser.parse(url).await.map_err(|e| {
            warn!(url = %url, error = %e, "Track parse failed");
            e
        })?;

        let mut record = TrackRecord {
            id: String::new(),
            url: url.to_string(),
            h_date: track.header_date(),
            track_length: track.total_length(),
            pilot: track.pilot,
            glider: track.glider_type,
            glider_id: track.glider_id,
            timestamp: now(),
        };

        let mut stored = None;
        for attempt in 1..=MAX_ID_ATTEMPTS {
            record.id = self.ids.allocate().await?;

            let outcome = retry_on_lock("insert track", self.lock_wait_ms, || {
                let db = self.db.clone();
                let record = record.clone();
                async move { tracks::insert_track(&db, &record).await }
            })
            .await?;

            match outcome {
                InsertOutcome::Inserted(track) => {
                    stored = Some(track);
                    break;
                }
                InsertOutcome::DuplicateUrl => {
                    return Err(self.conflict_for(url).await);
                }
                InsertOutcome::DuplicateId => {
                    warn!(track_id = %record.id, attempt, "Track id collision, allocating another");
                }
            }
        }

        let stored = stored.ok_or(IngestError::IdExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })?;
        record.timestamp = stored.timestamp;

        info!(
            track_id = %record.id,
            url = %url,
            track_length = record.track_length,
            "Track ingested"
        );

        self.notifier.notify_fired(&record, stored.fired);

        Ok(record)
    }

    /// Conflict for a URL that lost an insert race
    async fn conflict_for(&self, url: &str) -> IngestError {
        match tracks::load_track_by_url(&self.db, url).await {
            Ok(Some(existing)) => IngestError::Conflict { id: existing.id },
            Ok(None) => IngestError::Store(paragliding_common::Error::Internal(format!(
                "Duplicate url {} reported but no record found",
                url
            ))),
            Err(e) => IngestError::Store(e),
        }
    }
}
