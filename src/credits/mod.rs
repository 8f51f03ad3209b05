/// Student credits: activity claims pending teacher/admin validation
mod manager;

pub use manager::CreditManager;

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The three fixed pillars credits are classified under. Serialized by
/// their Bulgarian display names, which is what clients send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pillar {
    #[serde(rename = "Мислене")]
    Thinking,
    #[serde(rename = "Характер")]
    Character,
    #[serde(rename = "Общност")]
    Community,
}

impl Pillar {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pillar::Thinking => "Мислене",
            Pillar::Character => "Характер",
            Pillar::Community => "Общност",
        }
    }

    pub fn from_str(s: &str) -> ApiResult<Self> {
        match s {
            "Мислене" => Ok(Pillar::Thinking),
            "Характер" => Ok(Pillar::Character),
            "Общност" => Ok(Pillar::Community),
            _ => Err(ApiError::Validation(format!("Invalid pillar: {}", s))),
        }
    }

}

/// Credit lifecycle. `pending -> {validated, rejected}`; decided states are
/// terminal except for an admin override between them. Nothing returns to
/// pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditStatus {
    Pending,
    Validated,
    Rejected,
}

impl CreditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditStatus::Pending => "pending",
            CreditStatus::Validated => "validated",
            CreditStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> ApiResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(CreditStatus::Pending),
            "validated" => Ok(CreditStatus::Validated),
            "rejected" => Ok(CreditStatus::Rejected),
            _ => Err(ApiError::Validation(format!("Invalid credit status: {}", s))),
        }
    }
}

/// A credit row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credit {
    pub id: String,
    pub student_id: String,
    pub pillar: Pillar,
    pub activity: String,
    pub description: Option<String>,
    pub status: CreditStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Credit submission
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCreditRequest {
    pub pillar: Pillar,
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub activity: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
}

/// Owner edit of a still-pending credit
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCreditRequest {
    pub pillar: Option<Pillar>,
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub activity: Option<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
}

/// Teacher/admin decision
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateCreditRequest {
    pub status: CreditStatus,
}

/// Credit category reference data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCategory {
    pub id: String,
    pub pillar: Pillar,
    pub name: String,
    pub description: Option<String>,
}
