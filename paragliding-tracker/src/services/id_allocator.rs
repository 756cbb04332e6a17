//! Track id allocation
//!
//! Ids only need to be unique among stored tracks. The store's primary key is
//! the backstop: a collision on insert is reported back to the ingestion
//! service, which asks for another id.

use async_trait::async_trait;
use paragliding_common::config::IdStrategy;
use paragliding_common::db::TRACK_ID_COUNTER;
use paragliding_common::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::counters;

/// Produces candidate track ids
#[async_trait]
pub trait IdAllocator: Send + Sync {
    async fn allocate(&self) -> Result<String>;
}

/// Persisted monotonic counter: "1", "2", ...
///
/// The counter survives restarts and delete-all, so ids are never reused.
pub struct CounterIdAllocator {
    db: SqlitePool,
}

impl CounterIdAllocator {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdAllocator for CounterIdAllocator {
    async fn allocate(&self) -> Result<String> {
        let value = counters::increment(&self.db, TRACK_ID_COUNTER).await?;
        Ok(value.to_string())
    }
}

/// Random UUIDv4 ids
pub struct UuidIdAllocator;

#[async_trait]
impl IdAllocator for UuidIdAllocator {
    async fn allocate(&self) -> Result<String> {
        Ok(Uuid::new_v4().to_string())
    }
}

/// Build the allocator selected in configuration
pub fn allocator_for(strategy: IdStrategy, db: SqlitePool) -> Arc<dyn IdAllocator> {
    match strategy {
        IdStrategy::Counter => Arc::new(CounterIdAllocator::new(db)),
        IdStrategy::Uuid => Arc::new(UuidIdAllocator),
    }
}
