/// Student profile management
///
/// One profile per student-role user; the profile id is what every other
/// student-owned resource references.
mod manager;

pub use manager::StudentManager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A student profile row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: String,
    pub user_id: String,
    pub grade: i64,
    pub specialization: Option<String>,
    pub average_grade: Option<f64>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile creation request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    #[validate(range(min = 8, max = 12, message = "grade must be between 8 and 12"))]
    pub grade: i64,
    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub specialization: Option<String>,
    #[validate(range(min = 2.0, max = 6.0, message = "average grade must be between 2 and 6"))]
    pub average_grade: Option<f64>,
    pub image_url: Option<String>,
}

/// Profile update request; absent fields are left untouched
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(range(min = 8, max = 12, message = "grade must be between 8 and 12"))]
    pub grade: Option<i64>,
    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub specialization: Option<String>,
    #[validate(range(min = 2.0, max = 6.0, message = "average grade must be between 2 and 6"))]
    pub average_grade: Option<f64>,
    pub image_url: Option<String>,
}
