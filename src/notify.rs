use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::NewNotification;
use crate::repo::{RepoError, SharedRepo};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("store: {0}")]
    Store(#[from] RepoError),
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook answered {0}")]
    Status(reqwest::StatusCode),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: NewNotification) -> Result<(), NotifyError>;
}

/// Writes notifications into the store, where `GET /notifications` reads them back.
pub struct InboxNotifier {
    repo: SharedRepo,
}

impl InboxNotifier {
    pub fn new(repo: SharedRepo) -> Self { Self { repo } }
}

#[async_trait]
impl Notifier for InboxNotifier {
    async fn notify(&self, notification: NewNotification) -> Result<(), NotifyError> {
        self.repo.insert_notification(notification).await?;
        Ok(())
    }
}

/// POSTs each notification as JSON to an external notification service.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), url: url.into() }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: NewNotification) -> Result<(), NotifyError> {
        let resp = self.client.post(&self.url).json(&notification).send().await?;
        if !resp.status().is_success() {
            return Err(NotifyError::Status(resp.status()));
        }
        Ok(())
    }
}

/// Best-effort dispatch point for notifications.
///
/// `emit` has no error channel: delivery failures and timeouts are logged and counted,
/// never handed back to the vote or comment that triggered them.
#[derive(Clone)]
pub struct BestEffort {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_millis(2000);

impl BestEffort {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier, timeout: DEFAULT_NOTIFY_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Timeout from `NOTIFY_TIMEOUT_MS`, falling back to the default.
    pub fn from_env(notifier: Arc<dyn Notifier>) -> Self {
        let timeout = std::env::var("NOTIFY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_NOTIFY_TIMEOUT);
        Self::new(notifier).with_timeout(timeout)
    }

    pub async fn emit(&self, notification: NewNotification) {
        let recipient = notification.recipient.clone();
        let outcome = match tokio::time::timeout(self.timeout, self.notifier.notify(notification)).await {
            Ok(res) => res,
            Err(_) => Err(NotifyError::Timeout(self.timeout)),
        };
        match outcome {
            Ok(()) => debug!(%recipient, "notification delivered"),
            Err(e) => {
                metrics::counter!("tradepost_notifications_failed_total").increment(1);
                warn!(%recipient, error = %e, "notification dropped");
            }
        }
    }
}

/// Picks the webhook notifier when `NOTIFY_WEBHOOK_URL` is set, the store inbox otherwise.
pub fn build_notifier(repo: SharedRepo) -> Arc<dyn Notifier> {
    match std::env::var("NOTIFY_WEBHOOK_URL") {
        Ok(url) if !url.trim().is_empty() => Arc::new(WebhookNotifier::new(url)),
        _ => Arc::new(InboxNotifier::new(repo)),
    }
}
