//! Database retry logic
//!
//! Exponential backoff for transient "database is locked" errors. SQLite's own
//! busy_timeout covers most contention; this handles the cases where a writer
//! still gives up (e.g. long WAL checkpoints under concurrent ingestion).

use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Initial backoff delay
const INITIAL_BACKOFF_MS: u64 = 10;

/// Backoff ceiling
const MAX_BACKOFF_MS: u64 = 1000;

/// Retry a database operation with exponential backoff until `max_wait_ms` elapses.
///
/// Only lock errors are retried; any other error is returned immediately.
pub async fn retry_on_lock<F, Fut, T>(operation_name: &str, max_wait_ms: u64, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let max_duration = Duration::from_millis(max_wait_ms);
    let mut attempt = 0;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Database operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !err.is_lock_error() => return Err(err),
            Err(_) => {
                let elapsed = start_time.elapsed();

                if elapsed >= max_duration {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        max_wait_ms,
                        "Database operation failed: max retry time exceeded"
                    );
                    return Err(Error::Internal(format!(
                        "Database locked after {} attempts ({} ms elapsed, max {} ms)",
                        attempt,
                        elapsed.as_millis(),
                        max_wait_ms
                    )));
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms,
                    "Database locked, will retry after backoff"
                );

                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_retry_succeeds_first_attempt() {
        let result = retry_on_lock("test_op", 5000, || async { Ok::<i32, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_non_lock_error_fails_immediately() {
        let mut attempts = 0;

        let result = retry_on_lock("test_op", 5000, || {
            attempts += 1;
            async { Err::<i32, Error>(Error::Internal("other error".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(Error::Internal(_))));
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_lock_error_retried_until_success() {
        let mut attempts = 0;

        let result = retry_on_lock("test_op", 5000, || {
            attempts += 1;
            let current = attempts;
            async move {
                if current < 3 {
                    Err(Error::Database(sqlx::Error::Protocol("database is locked".to_string())))
                } else {
                    Ok(current)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_lock_error_gives_up_after_max_wait() {
        let result = retry_on_lock("test_op", 30, || async {
            Err::<i32, Error>(Error::Database(sqlx::Error::Protocol(
                "database is locked".to_string(),
            )))
        })
        .await;

        assert!(matches!(result, Err(Error::Internal(_))));
    }
}
