//! Shared fixtures for paragliding-tracker integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use paragliding_common::db::init_database;
use paragliding_common::igc::{GeoPoint, IgcError, IgcTrack};
use paragliding_tracker::services::id_allocator::CounterIdAllocator;
use paragliding_tracker::services::webhook_notifier::Notification;
use paragliding_tracker::services::{
    IngestionService, ParseError, TickerService, TrackParser, WebhookNotifier,
};
use paragliding_tracker::AppState;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Minimal valid IGC file with two fixes
pub const SAMPLE_IGC: &str = "AXXXABC FLIGHT:1\r\n\
HFDTE190216\r\n\
HFPLTPILOTINCHARGE: Miguel Angel Gordillo\r\n\
HFGTYGLIDERTYPE: RV8\r\n\
HFGIDGLIDERID: EC-XLL\r\n\
B1101355206343N00006198WA0058700558\r\n\
B1101455206259N00006130WA0059300556\r\n";

/// Parser stand-in: never touches the network.
///
/// URLs containing "broken" fail as an unparsable file, URLs containing
/// "single" yield a one-point track. Every call is counted.
pub struct StubParser {
    pub calls: AtomicUsize,
    pub delay: Duration,
}

impl StubParser {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn two_point_track() -> IgcTrack {
    IgcTrack {
        pilot: "Miguel Angel Gordillo".to_string(),
        glider_type: "RV8".to_string(),
        glider_id: "EC-XLL".to_string(),
        date: NaiveDate::from_ymd_opt(2016, 2, 19),
        points: vec![GeoPoint::new(52.0, 0.0), GeoPoint::new(53.0, 0.0)],
    }
}

#[async_trait]
impl TrackParser for StubParser {
    async fn parse(&self, url: &str) -> Result<IgcTrack, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if url.contains("broken") {
            return Err(ParseError::Format(IgcError::NotIgc(
                "first record is not an A record".to_string(),
            )));
        }

        let mut track = two_point_track();
        if url.contains("single") {
            track.points.truncate(1);
        }
        Ok(track)
    }
}

/// Services wired against a throwaway database
pub struct TestContext {
    pub _dir: tempfile::TempDir,
    pub pool: SqlitePool,
    pub parser: Arc<StubParser>,
    pub state: AppState,
    pub notifications: mpsc::Receiver<Notification>,
}

pub async fn setup() -> TestContext {
    setup_with(StubParser::new(), None).await
}

pub async fn setup_with(parser: StubParser, ticker_page_size: Option<usize>) -> TestContext {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("tracker.db")).await.unwrap();
    let parser = Arc::new(parser);

    let (notifier, notifications) = WebhookNotifier::new(pool.clone(), 64);
    let ingestion = IngestionService::new(
        pool.clone(),
        parser.clone(),
        Arc::new(CounterIdAllocator::new(pool.clone())),
        notifier.clone(),
        5000,
    );
    let ticker = TickerService::new(pool.clone(), ticker_page_size);
    let state = AppState::new(pool.clone(), ingestion, ticker, notifier);

    TestContext {
        _dir: dir,
        pool,
        parser,
        state,
        notifications,
    }
}

/// Drain every notification queued so far
pub fn drain(rx: &mut mpsc::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}
