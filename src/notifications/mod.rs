/// In-app notification system
///
/// Domain services emit `DomainEvent`s on the bus; the dispatcher turns them
/// into notification rows and best-effort emails. Handlers never talk to the
/// mailer directly.
mod bus;
mod dispatcher;
mod manager;

pub use bus::{DomainEvent, EventBus};
pub use dispatcher::NotificationDispatcher;
pub use manager::NotificationManager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Retention window for notification rows
pub const RETENTION_DAYS: i64 = 30;

/// Notification severity shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

/// What part of the platform a notification relates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Event,
    Credit,
    Absence,
    Sanction,
    System,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Event => "event",
            NotificationCategory::Credit => "credit",
            NotificationCategory::Absence => "absence",
            NotificationCategory::Sanction => "sanction",
            NotificationCategory::System => "system",
        }
    }
}

/// A stored notification
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
    pub is_read: bool,
    pub is_email_sent: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload shared by every recipient of a fan-out
#[derive(Debug, Clone)]
pub struct NotificationPayload {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub category: NotificationCategory,
    pub related_model: Option<String>,
    pub related_id: Option<String>,
    /// Attempt a best-effort email per recipient
    pub send_email: bool,
}
