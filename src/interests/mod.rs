/// Student interests: one record per student with set semantics
mod manager;

pub use manager::InterestManager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caps on the two lists
pub const MAX_INTEREST_PAIRS: usize = 20;
pub const MAX_HOBBIES: usize = 15;

/// A (category, subcategory) interest pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestPair {
    pub category: String,
    pub subcategory: String,
}

/// The per-student interests record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interests {
    pub student_id: String,
    pub interests: Vec<InterestPair>,
    pub hobbies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Interests {
    /// The synthesized shape returned when no record exists yet
    pub fn default_for(student_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            interests: Vec::new(),
            hobbies: Vec::new(),
            updated_at: None,
        }
    }
}

/// Full-replace update request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInterestsRequest {
    pub interests: Vec<InterestPair>,
    pub hobbies: Vec<String>,
}
