/// Student portfolios: narrative, mentor, recommendations
mod manager;

pub use manager::PortfolioManager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Cap on recommendations per portfolio
pub const MAX_RECOMMENDATIONS: usize = 10;

/// The per-student portfolio
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub student_id: String,
    pub experience: String,
    pub projects: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentor_id: Option<String>,
    pub recommendations: Vec<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Portfolio {
    /// The synthesized shape returned when no record exists yet
    pub fn default_for(student_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            experience: String::new(),
            projects: String::new(),
            mentor_id: None,
            recommendations: Vec::new(),
            updated_at: None,
        }
    }
}

/// A third-party recommendation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    pub text: String,
    pub author: String,
    pub date: DateTime<Utc>,
}

/// Portfolio update request; absent fields are left untouched
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePortfolioRequest {
    #[validate(length(max = 10000, message = "must be at most 10000 characters"))]
    pub experience: Option<String>,
    #[validate(length(max = 10000, message = "must be at most 10000 characters"))]
    pub projects: Option<String>,
    pub mentor_id: Option<String>,
}

/// New recommendation
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddRecommendationRequest {
    #[validate(length(min = 1, max = 2000, message = "must be 1-2000 characters"))]
    pub text: String,
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub author: String,
}
