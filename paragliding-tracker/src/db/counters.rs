//! Durable named counters (track id sequence, ingested-tracks count)

use paragliding_common::{Error, Result};
use sqlx::{Executor, Sqlite};

/// Atomically increment a counter and return the new value.
///
/// Accepts a pool or an open transaction.
pub async fn increment<'e, E>(executor: E, name: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("UPDATE counters SET value = value + 1 WHERE name = ? RETURNING value")
        .bind(name)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::Internal(format!("Counter not initialized: {}", name)))
}

/// Read the current value of a counter
pub async fn get<'e, E>(executor: E, name: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT value FROM counters WHERE name = ?")
        .bind(name)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::Internal(format!("Counter not initialized: {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use paragliding_common::db::{init_database, TRACK_ID_COUNTER};

    #[tokio::test]
    async fn test_increment_is_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("test.db")).await.unwrap();

        assert_eq!(increment(&pool, TRACK_ID_COUNTER).await.unwrap(), 1);
        assert_eq!(increment(&pool, TRACK_ID_COUNTER).await.unwrap(), 2);
        assert_eq!(get(&pool, TRACK_ID_COUNTER).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unknown_counter_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("test.db")).await.unwrap();

        assert!(matches!(increment(&pool, "missing").await, Err(Error::Internal(_))));
        assert!(matches!(get(&pool, "missing").await, Err(Error::Internal(_))));
    }
}
