/// School events and participation
mod manager;

pub use manager::EventManager;

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An event row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub organizer: Option<String>,
    pub feedback_url: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Participation lifecycle.
/// `registered -> {confirmed, cancelled}`, `confirmed -> {attended}`;
/// `cancelled` and `attended` are terminal. The unique (event, student)
/// pair means a cancelled row permanently consumes the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationStatus {
    Registered,
    Confirmed,
    Attended,
    Cancelled,
}

impl ParticipationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipationStatus::Registered => "registered",
            ParticipationStatus::Confirmed => "confirmed",
            ParticipationStatus::Attended => "attended",
            ParticipationStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> ApiResult<Self> {
        match s.to_lowercase().as_str() {
            "registered" => Ok(ParticipationStatus::Registered),
            "confirmed" => Ok(ParticipationStatus::Confirmed),
            "attended" => Ok(ParticipationStatus::Attended),
            "cancelled" => Ok(ParticipationStatus::Cancelled),
            _ => Err(ApiError::Validation(format!(
                "Invalid participation status: {}",
                s
            ))),
        }
    }

    /// Forward-only transition check
    pub fn can_transition_to(&self, next: ParticipationStatus) -> bool {
        matches!(
            (*self, next),
            (
                ParticipationStatus::Registered,
                ParticipationStatus::Confirmed
            ) | (
                ParticipationStatus::Registered,
                ParticipationStatus::Cancelled
            ) | (
                ParticipationStatus::Confirmed,
                ParticipationStatus::Attended
            )
        )
    }
}

/// A participation row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventParticipation {
    pub id: String,
    pub event_id: String,
    pub student_id: String,
    pub status: ParticipationStatus,
    pub registered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_date: Option<DateTime<Utc>>,
}

/// Event creation request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub location: Option<String>,
    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub organizer: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub feedback_url: Option<String>,
}

/// Event update request; absent fields are left untouched
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub location: Option<String>,
    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub organizer: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub feedback_url: Option<String>,
}

/// Participant feedback submission
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(length(min = 1, max = 2000, message = "must be 1-2000 characters"))]
    pub feedback: String,
}
