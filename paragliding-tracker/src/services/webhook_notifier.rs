//! Webhook registry and notifier
//!
//! Subscribers ask to be told about every N newly ingested tracks. Counting
//! happens in the store, inside the transaction that inserts the track (see
//! `db::webhooks::record_track_added`). Delivery is handed to a bounded queue
//! drained by a background dispatcher, so the ingesting request never waits
//! on a subscriber.
//!
//! Delivery is best effort: one attempt, bounded by the HTTP client timeout,
//! failures logged and dropped.

use paragliding_common::db::{TrackRecord, WebhookSubscription};
use paragliding_common::time::{now, to_millis};
use paragliding_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::webhooks::{self, FiredWebhook};

/// Body POSTed to a subscriber's callback URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    /// Tracks ingested in this batch
    pub new_tracks: i64,
    /// Earliest ingestion time (Unix ms) in the batch
    pub t_start: i64,
    /// Latest ingestion time (Unix ms) in the batch
    pub t_stop: i64,
    /// Tracks in the batch, oldest first
    pub ids: Vec<String>,
    /// Human-readable summary for chat-style receivers
    pub content: String,
}

/// One queued delivery
#[derive(Debug, Clone)]
pub struct Notification {
    pub subscription_id: String,
    pub callback_url: String,
    pub payload: NotificationPayload,
}

/// Trigger counts below 1 (or absent) mean "every track"
pub fn normalize_trigger_count(trigger_count: Option<i64>) -> i64 {
    match trigger_count {
        Some(n) if n > 0 => n,
        _ => 1,
    }
}

/// Callback URLs must be absolute http(s) URLs
pub fn validate_callback_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| Error::InvalidInput(format!("Invalid webhook URL '{}': {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidInput(format!(
            "Unsupported webhook URL scheme: {}",
            other
        ))),
    }
}

/// Webhook registry plus the "track added" hook
#[derive(Clone)]
pub struct WebhookNotifier {
    db: SqlitePool,
    sender: mpsc::Sender<Notification>,
}

impl WebhookNotifier {
    /// Create a notifier and the receiving end of its delivery queue.
    ///
    /// Callers either hand the receiver to [`run_dispatcher`] or consume it
    /// themselves.
    pub fn new(db: SqlitePool, queue_capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        (Self { db, sender }, receiver)
    }

    /// Create a notifier whose queue is drained by a spawned dispatcher task
    pub fn spawn(
        db: SqlitePool,
        http_client: reqwest::Client,
        queue_capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (notifier, receiver) = Self::new(db, queue_capacity);
        let handle = tokio::spawn(run_dispatcher(http_client, receiver));
        (notifier, handle)
    }

    /// Register a subscriber
    pub async fn register(
        &self,
        callback_url: &str,
        trigger_count: Option<i64>,
    ) -> Result<WebhookSubscription> {
        validate_callback_url(callback_url)?;

        let subscription = WebhookSubscription {
            id: Uuid::new_v4().to_string(),
            callback_url: callback_url.to_string(),
            trigger_count: normalize_trigger_count(trigger_count),
            pending_count: 0,
            window_start: None,
            created_at: now(),
        };

        webhooks::insert_webhook(&self.db, &subscription).await?;
        info!(
            webhook_id = %subscription.id,
            trigger_count = subscription.trigger_count,
            "Registered webhook"
        );

        Ok(subscription)
    }

    /// Look up a subscriber
    pub async fn find(&self, id: &str) -> Result<WebhookSubscription> {
        webhooks::load_webhook(&self.db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Webhook {}", id)))
    }

    /// Remove a subscriber, returning what was removed
    pub async fn unregister(&self, id: &str) -> Result<WebhookSubscription> {
        let subscription = self.find(id).await?;
        if !webhooks::delete_webhook(&self.db, id).await? {
            // Removed concurrently between lookup and delete
            return Err(Error::NotFound(format!("Webhook {}", id)));
        }
        info!(webhook_id = %id, "Unregistered webhook");
        Ok(subscription)
    }

    /// Queue one notification per batch the committed track completed.
    ///
    /// Never waits and never fails: a full or closed queue drops the
    /// notification with a warning.
    pub fn notify_fired(&self, record: &TrackRecord, fired: Vec<FiredWebhook>) {
        for hook in fired {
            let payload = NotificationPayload {
                new_tracks: hook.new_tracks,
                t_start: to_millis(hook.window_start),
                t_stop: to_millis(hook.window_stop),
                content: format!(
                    "{} new track(s) ingested, latest id {}",
                    hook.new_tracks, record.id
                ),
                ids: hook.ids,
            };

            let notification = Notification {
                subscription_id: hook.id,
                callback_url: hook.callback_url,
                payload,
            };

            match self.sender.try_send(notification) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(n)) => {
                    warn!(webhook_id = %n.subscription_id, "Notification queue full, dropping notification");
                }
                Err(mpsc::error::TrySendError::Closed(n)) => {
                    warn!(webhook_id = %n.subscription_id, "Notification dispatcher stopped, dropping notification");
                }
            }
        }
    }
}

/// Build the HTTP client used for deliveries
pub fn notification_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("paragliding-tracker/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Internal(format!("Failed to build webhook client: {}", e)))
}

/// Drain the queue, delivering each notification on its own task.
///
/// Returns once every sender is dropped and all in-flight deliveries have
/// finished.
pub async fn run_dispatcher(http_client: reqwest::Client, mut receiver: mpsc::Receiver<Notification>) {
    let mut deliveries = JoinSet::new();

    loop {
        tokio::select! {
            next = receiver.recv() => match next {
                Some(notification) => {
                    let client = http_client.clone();
                    deliveries.spawn(async move {
                        deliver(&client, &notification).await;
                    });
                }
                None => break,
            },
            Some(joined) = deliveries.join_next(), if !deliveries.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "Webhook delivery task failed");
                }
            }
        }
    }

    debug!(in_flight = deliveries.len(), "Notification queue closed, finishing deliveries");
    while let Some(joined) = deliveries.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Webhook delivery task failed");
        }
    }
    debug!("Notification dispatcher stopped");
}

/// Single delivery attempt; outcome is logged only
pub async fn deliver(http_client: &reqwest::Client, notification: &Notification) {
    let result = http_client
        .post(&notification.callback_url)
        .json(&notification.payload)
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            info!(
                webhook_id = %notification.subscription_id,
                new_tracks = notification.payload.new_tracks,
                "Webhook notified"
            );
        }
        Ok(response) => {
            warn!(
                webhook_id = %notification.subscription_id,
                status = response.status().as_u16(),
                "Webhook returned non-success status"
            );
        }
        Err(e) => {
            warn!(
                webhook_id = %notification.subscription_id,
                error = %e,
                "Webhook delivery failed"
            );
        }
    }
}
