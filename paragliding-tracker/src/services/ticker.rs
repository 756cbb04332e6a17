//! Ticker: time-windowed pages of ingested track ids
//!
//! The three boundary timestamps are independent reductions over the set of
//! ingestion timestamps:
//! - latest: maximum
//! - oldest: minimum
//! - oldest newer than `since`: smallest timestamp strictly greater than
//!   `since`, falling back to the oldest when `since` is absent or nothing is
//!   newer
//!
//! The id page holds records inside `[start, latest]` that are also strictly
//! newer than `since`, so polling with `since = previous stop` never repeats
//! an id and returns an empty page once nothing new has arrived.

use chrono::{DateTime, Utc};
use paragliding_common::time::parse_timestamp;
use paragliding_common::Result;
use sqlx::SqlitePool;

use crate::db::tracks;

/// One (id, ingestion timestamp) pair
#[derive(Debug, Clone, PartialEq)]
pub struct TickerEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

/// A computed ticker page
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    pub latest: DateTime<Utc>,
    pub start: DateTime<Utc>,
    /// Timestamp of the last id in a truncated page, otherwise `latest`
    pub stop: DateTime<Utc>,
    pub ids: Vec<String>,
}

/// Maximum ingestion timestamp
pub fn latest_timestamp(entries: &[TickerEntry]) -> Option<DateTime<Utc>> {
    entries.iter().map(|e| e.timestamp).max()
}

/// Minimum ingestion timestamp
pub fn oldest_timestamp(entries: &[TickerEntry]) -> Option<DateTime<Utc>> {
    entries.iter().map(|e| e.timestamp).min()
}

/// Smallest timestamp strictly greater than `since`, else the oldest
pub fn oldest_newer_timestamp(
    entries: &[TickerEntry],
    since: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    since
        .and_then(|since| {
            entries
                .iter()
                .map(|e| e.timestamp)
                .filter(|ts| *ts > since)
                .min()
        })
        .or_else(|| oldest_timestamp(entries))
}

/// Build a ticker page; `None` when there are no entries
pub fn build_ticker(
    entries: &[TickerEntry],
    since: Option<DateTime<Utc>>,
    page_size: Option<usize>,
) -> Option<Ticker> {
    let latest = latest_timestamp(entries)?;
    let start = oldest_newer_timestamp(entries, since)?;

    let mut window: Vec<&TickerEntry> = entries
        .iter()
        .filter(|e| e.timestamp >= start && e.timestamp <= latest)
        .filter(|e| since.map_or(true, |since| e.timestamp > since))
        .collect();
    window.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let mut stop = latest;
    if let Some(limit) = page_size {
        if window.len() > limit {
            window.truncate(limit);
            if let Some(last) = window.last() {
                stop = last.timestamp;
            }
        }
    }

    Some(Ticker {
        latest,
        start,
        stop,
        ids: window.into_iter().map(|e| e.id.clone()).collect(),
    })
}

/// Ticker queries against the track store
#[derive(Clone)]
pub struct TickerService {
    db: SqlitePool,
    page_size: Option<usize>,
}

impl TickerService {
    pub fn new(db: SqlitePool, page_size: Option<usize>) -> Self {
        Self { db, page_size }
    }

    /// Ticker page for an optional raw `since` value.
    ///
    /// A malformed `since` is `InvalidInput`; an empty store is `Ok(None)`.
    pub async fn ticker(&self, since: Option<&str>) -> Result<Option<Ticker>> {
        let since = since.map(parse_timestamp).transpose()?;
        let entries = self.load_entries().await?;
        Ok(build_ticker(&entries, since, self.page_size))
    }

    /// Latest ingestion timestamp; `None` when the store is empty
    pub async fn latest(&self) -> Result<Option<DateTime<Utc>>> {
        let entries = self.load_entries().await?;
        Ok(latest_timestamp(&entries))
    }

    async fn load_entries(&self) -> Result<Vec<TickerEntry>> {
        let rows = tracks::load_track_timestamps(&self.db).await?;
        Ok(rows
            .into_iter()
            .map(|(id, timestamp)| TickerEntry { id, timestamp })
            .collect())
    }
}
