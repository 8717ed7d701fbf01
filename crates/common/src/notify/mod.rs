//! Notification abstraction
//!
//! The workflow hands structured notifications to a `Notifier`; rendering
//! and delivery belong to the provider. Providers:
//! - Log (emits the notification as a log event)
//! - Webhook (POSTs JSON to a delivery service)
//! - Recording (test double)
//!
//! A failed or timed-out delivery never undoes the state change that caused
//! it; `Dispatcher` turns it into a `DeliveryWarning` on the `Outcome`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{NotifierConfig, NotifierProvider};
use crate::db::models::SubmissionStatus;
use crate::errors::{AppError, Result};
use crate::metrics;

/// What an editor is being told about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorAction {
    Assigned,
    ReadyForReview,
    RevisionSubmitted,
}

impl EditorAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditorAction::Assigned => "assigned",
            EditorAction::ReadyForReview => "ready_for_review",
            EditorAction::RevisionSubmitted => "revision_submitted",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            EditorAction::Assigned => "A new article has been assigned to you for review.",
            EditorAction::ReadyForReview => {
                "The previous review stage is complete. This article is now ready for your review."
            }
            EditorAction::RevisionSubmitted => {
                "The author has submitted a revised version of their article."
            }
        }
    }
}

/// A notification to one recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    SubmissionReceived {
        author_email: String,
        author_name: String,
        title: String,
        submission_id: String,
    },
    #[serde(rename_all = "camelCase")]
    StatusUpdate {
        author_email: String,
        author_name: String,
        title: String,
        status: SubmissionStatus,
        feedback: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    EditorAction {
        editor_email: String,
        editor_name: String,
        title: String,
        action: EditorAction,
    },
}

impl Notification {
    /// Stable kind label for metrics and warnings
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::SubmissionReceived { .. } => "submission_received",
            Notification::StatusUpdate { .. } => "status_update",
            Notification::EditorAction { action, .. } => match action {
                EditorAction::Assigned => "editor_assigned",
                EditorAction::ReadyForReview => "editor_ready_for_review",
                EditorAction::RevisionSubmitted => "editor_revision_submitted",
            },
        }
    }

    /// Recipient address
    pub fn recipient(&self) -> &str {
        match self {
            Notification::SubmissionReceived { author_email, .. }
            | Notification::StatusUpdate { author_email, .. } => author_email,
            Notification::EditorAction { editor_email, .. } => editor_email,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::SubmissionReceived { title, .. } => {
                format!("Submission Received: {}", title)
            }
            Notification::StatusUpdate { title, .. } => format!("Article Update: {}", title),
            Notification::EditorAction { title, .. } => format!("Action Required: {}", title),
        }
    }

    /// Plain-text summary line
    pub fn summary(&self) -> String {
        match self {
            Notification::SubmissionReceived { submission_id, .. } => {
                format!("Your submission was received. Reference: {}", submission_id)
            }
            Notification::StatusUpdate { status, .. } => status_message(*status).to_string(),
            Notification::EditorAction { action, .. } => action.message().to_string(),
        }
    }
}

fn status_message(status: SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::CeReview => "Your article is now being reviewed by our Copy Editor.",
        SubmissionStatus::AeReview => {
            "Your article has passed Copy Editing and is now with our Associate Editor."
        }
        SubmissionStatus::SeReview => {
            "Your article is in the final review stage with our Senior Editor."
        }
        SubmissionStatus::AuthorRevision => {
            "Our editors have provided feedback. Please review and revise your article."
        }
        SubmissionStatus::Approved => {
            "Congratulations! Your article has been approved for publication."
        }
        SubmissionStatus::Published => "Your article has been published on the blog.",
        SubmissionStatus::Rejected => {
            "Unfortunately, your article could not be accepted at this time."
        }
        SubmissionStatus::Submitted => "Your article status has been updated.",
    }
}

/// Trait for notification delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification
    async fn send(&self, notification: &Notification) -> Result<()>;

    /// Provider name for logs
    fn provider_name(&self) -> &'static str;
}

/// Writes notifications to the log instead of delivering them
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        info!(
            kind = notification.kind(),
            to = notification.recipient(),
            subject = %notification.subject(),
            "Notification"
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "log"
    }
}

/// Delivery service client
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    from_address: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: String,
    text: String,
    notification: &'a Notification,
}

impl WebhookNotifier {
    pub fn new(config: &NotifierConfig) -> Result<Self> {
        let url = config.webhook_url.clone().ok_or_else(|| AppError::Configuration {
            message: "notifier.webhook_url is not set".to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url,
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let request = DeliveryRequest {
            from: &self.from_address,
            to: notification.recipient(),
            subject: notification.subject(),
            text: notification.summary(),
            notification,
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| AppError::NotifierUnavailable {
            message: format!("Request failed: {}", e),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::NotifierUnavailable {
                message: format!("Delivery error {}: {}", status, body),
            });
        }

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "webhook"
    }
}

/// Test double that records what it is asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing_recipients: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make deliveries to `recipient` fail
    pub async fn fail_for(&self, recipient: &str) {
        self.failing_recipients.lock().await.insert(recipient.to_string());
    }

    /// Successfully delivered notifications, in order
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        if self
            .failing_recipients
            .lock()
            .await
            .contains(notification.recipient())
        {
            return Err(AppError::NotifierUnavailable {
                message: format!("mailbox {} unavailable", notification.recipient()),
            });
        }
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Create the configured notifier
pub fn create_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match config.provider {
        NotifierProvider::Log => Arc::new(LogNotifier),
        NotifierProvider::Webhook => Arc::new(WebhookNotifier::new(config)?),
    };
    info!(provider = notifier.provider_name(), "Notifier initialized");
    Ok(notifier)
}

/// A notification that could not be delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryWarning {
    pub recipient: String,
    pub kind: String,
    pub reason: String,
}

/// Result of an operation whose side-notifications may have failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<DeliveryWarning>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<DeliveryWarning>) -> Self {
        Self { value, warnings }
    }

    /// Succeeded, but at least one notification was not delivered
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

/// Sends notifications under a timeout and never fails
#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, timeout: Duration) -> Self {
        Self { notifier, timeout }
    }

    /// Deliver `notification`, returning a warning instead of an error
    pub async fn deliver(&self, notification: Notification) -> Option<DeliveryWarning> {
        let result = match tokio::time::timeout(self.timeout, self.notifier.send(&notification)).await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout {
                operation: format!("{} notification", notification.kind()),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        };

        metrics::record_notification(notification.kind(), result.is_ok());

        match result {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    kind = notification.kind(),
                    recipient = notification.recipient(),
                    error = %err,
                    "Notification not delivered"
                );
                Some(DeliveryWarning {
                    recipient: notification.recipient().to_string(),
                    kind: notification.kind().to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Deliver in order, collecting warnings
    pub async fn deliver_all(&self, notifications: Vec<Notification>) -> Vec<DeliveryWarning> {
        let mut warnings = Vec::new();
        for notification in notifications {
            if let Some(warning) = self.deliver(notification).await {
                warnings.push(warning);
            }
        }
        warnings
    }
}
