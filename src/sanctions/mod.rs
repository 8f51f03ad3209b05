/// Sanction records: absence counters, school remarks, active sanctions
mod manager;

pub use manager::SanctionManager;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default absence ceiling for a fresh record
pub const DEFAULT_MAX_ALLOWED: i64 = 150;

/// Fraction of `max_allowed` past which absences are critical
pub const CRITICAL_THRESHOLD: f64 = 0.8;

/// The per-student sanction container
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanctionRecord {
    pub student_id: String,
    pub absences: Absences,
    pub schoolo_remarks: i64,
    pub active_sanctions: Vec<ActiveSanction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Absence counters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Absences {
    pub excused: i64,
    pub unexcused: i64,
    pub max_allowed: i64,
}

impl Absences {
    pub fn total(&self) -> i64 {
        self.excused + self.unexcused
    }
}

impl SanctionRecord {
    /// The synthesized shape returned when no record exists yet
    pub fn default_for(student_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            absences: Absences {
                excused: 0,
                unexcused: 0,
                max_allowed: DEFAULT_MAX_ALLOWED,
            },
            schoolo_remarks: 0,
            active_sanctions: Vec::new(),
            updated_at: None,
        }
    }
}

/// One active disciplinary sanction, independently removable
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSanction {
    pub id: String,
    pub kind: String,
    pub reason: String,
    pub start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub issued_by: String,
}

/// Absence counter update (full replace of the three counters)
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAbsencesRequest {
    #[validate(range(min = 0, message = "must not be negative"))]
    pub excused: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub unexcused: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub max_allowed: Option<i64>,
}

/// School remark counter update
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRemarksRequest {
    #[validate(range(min = 0, message = "must not be negative"))]
    pub schoolo_remarks: i64,
}

/// New active sanction
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddSanctionRequest {
    #[validate(length(min = 1, max = 60, message = "must be 1-60 characters"))]
    pub kind: String,
    #[validate(length(min = 1, max = 500, message = "must be 1-500 characters"))]
    pub reason: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}
