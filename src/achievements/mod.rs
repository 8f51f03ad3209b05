/// Student achievements
mod manager;

pub use manager::AchievementManager;

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Fixed achievement categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Academic,
    Sports,
    Arts,
    Community,
    Personal,
    Other,
}

impl AchievementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementCategory::Academic => "academic",
            AchievementCategory::Sports => "sports",
            AchievementCategory::Arts => "arts",
            AchievementCategory::Community => "community",
            AchievementCategory::Personal => "personal",
            AchievementCategory::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> ApiResult<Self> {
        match s.to_lowercase().as_str() {
            "academic" => Ok(AchievementCategory::Academic),
            "sports" => Ok(AchievementCategory::Sports),
            "arts" => Ok(AchievementCategory::Arts),
            "community" => Ok(AchievementCategory::Community),
            "personal" => Ok(AchievementCategory::Personal),
            "other" => Ok(AchievementCategory::Other),
            _ => Err(ApiError::Validation(format!(
                "Invalid achievement category: {}",
                s
            ))),
        }
    }
}

/// An achievement row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub student_id: String,
    pub category: AchievementCategory,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub place: Option<String>,
    pub issuer: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Achievement creation request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAchievementRequest {
    pub category: AchievementCategory,
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    pub date: NaiveDate,
    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub place: Option<String>,
    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub issuer: Option<String>,
}
