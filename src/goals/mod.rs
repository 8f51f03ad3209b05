/// Student goals: one per (student, category)
mod manager;

pub use manager::GoalManager;

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The six fixed goal categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalCategory {
    Education,
    Career,
    Personal,
    Health,
    Community,
    Hobby,
}

impl GoalCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalCategory::Education => "education",
            GoalCategory::Career => "career",
            GoalCategory::Personal => "personal",
            GoalCategory::Health => "health",
            GoalCategory::Community => "community",
            GoalCategory::Hobby => "hobby",
        }
    }

    pub fn from_str(s: &str) -> ApiResult<Self> {
        match s.to_lowercase().as_str() {
            "education" => Ok(GoalCategory::Education),
            "career" => Ok(GoalCategory::Career),
            "personal" => Ok(GoalCategory::Personal),
            "health" => Ok(GoalCategory::Health),
            "community" => Ok(GoalCategory::Community),
            "hobby" => Ok(GoalCategory::Hobby),
            _ => Err(ApiError::Validation(format!("Invalid goal category: {}", s))),
        }
    }

    pub fn all() -> [GoalCategory; 6] {
        [
            GoalCategory::Education,
            GoalCategory::Career,
            GoalCategory::Personal,
            GoalCategory::Health,
            GoalCategory::Community,
            GoalCategory::Hobby,
        ]
    }
}

/// Fixed display title per category. Pure configuration.
pub fn category_title(category: GoalCategory) -> &'static str {
    match category {
        GoalCategory::Education => "Education & Learning",
        GoalCategory::Career => "Career & Professional Growth",
        GoalCategory::Personal => "Personal Development",
        GoalCategory::Health => "Health & Sport",
        GoalCategory::Community => "Community & Volunteering",
        GoalCategory::Hobby => "Hobbies & Free Time",
    }
}

/// A goal row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub student_id: String,
    pub category: GoalCategory,
    pub title: String,
    pub description: Option<String>,
    pub activities: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Upsert request for one (student, category) slot
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertGoalRequest {
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 10, message = "must list 1-10 activities"))]
    pub activities: Vec<String>,
}
