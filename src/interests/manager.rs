/// Interest manager
///
/// Reads synthesize an empty record without persisting; only the write path
/// upserts. Duplicates within a submission are a Conflict, not a silent drop.
use crate::{
    db::parse_timestamp,
    error::{ApiError, ApiResult},
    interests::{
        InterestPair, Interests, UpdateInterestsRequest, MAX_HOBBIES, MAX_INTEREST_PAIRS,
    },
};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Clone)]
pub struct InterestManager {
    db: SqlitePool,
}

impl InterestManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Read the record, or the default shape when none exists. Never writes.
    pub async fn get_or_default(&self, student_id: &str) -> ApiResult<Interests> {
        let row = sqlx::query("SELECT * FROM interests WHERE student_id = ?1")
            .bind(student_id)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => map_interests(&row),
            None => Ok(Interests::default_for(student_id)),
        }
    }

    /// Replace the record after validating set semantics
    pub async fn update(
        &self,
        student_id: &str,
        req: &UpdateInterestsRequest,
    ) -> ApiResult<Interests> {
        let interests = validate_pairs(&req.interests)?;
        let hobbies = validate_hobbies(&req.hobbies)?;

        let interests_json = serde_json::to_string(&interests)
            .map_err(|e| ApiError::Internal(format!("Failed to encode interests: {}", e)))?;
        let hobbies_json = serde_json::to_string(&hobbies)
            .map_err(|e| ApiError::Internal(format!("Failed to encode hobbies: {}", e)))?;
        let now = Utc::now();

        let existing = sqlx::query("SELECT id FROM interests WHERE student_id = ?1")
            .bind(student_id)
            .fetch_optional(&self.db)
            .await?;

        match existing {
            Some(row) => {
                let id: String = row.get("id");
                sqlx::query(
                    "UPDATE interests SET categories = ?1, hobbies = ?2, updated_at = ?3
                     WHERE id = ?4",
                )
                .bind(&interests_json)
                .bind(&hobbies_json)
                .bind(now.to_rfc3339())
                .bind(&id)
                .execute(&self.db)
                .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO interests (id, student_id, categories, hobbies, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .bind(Uuid::new_v4().to_string())
                .bind(student_id)
                .bind(&interests_json)
                .bind(&hobbies_json)
                .bind(now.to_rfc3339())
                .execute(&self.db)
                .await?;
            }
        }

        Ok(Interests {
            student_id: student_id.to_string(),
            interests,
            hobbies,
            updated_at: Some(now),
        })
    }
}

fn validate_pairs(pairs: &[InterestPair]) -> ApiResult<Vec<InterestPair>> {
    if pairs.len() > MAX_INTEREST_PAIRS {
        return Err(ApiError::Validation(format!(
            "At most {} interest pairs allowed",
            MAX_INTEREST_PAIRS
        )));
    }

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let category = pair.category.trim().to_string();
        let subcategory = pair.subcategory.trim().to_string();
        if category.is_empty() || subcategory.is_empty() {
            return Err(ApiError::Validation(
                "Interest category and subcategory cannot be empty".to_string(),
            ));
        }
        let key = (category.to_lowercase(), subcategory.to_lowercase());
        if !seen.insert(key) {
            return Err(ApiError::Conflict(format!(
                "Duplicate interest: {}/{}",
                category, subcategory
            )));
        }
        out.push(InterestPair {
            category,
            subcategory,
        });
    }
    Ok(out)
}

fn validate_hobbies(hobbies: &[String]) -> ApiResult<Vec<String>> {
    if hobbies.len() > MAX_HOBBIES {
        return Err(ApiError::Validation(format!(
            "At most {} hobbies allowed",
            MAX_HOBBIES
        )));
    }

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(hobbies.len());
    for hobby in hobbies {
        let trimmed = hobby.trim().to_string();
        if trimmed.is_empty() {
            return Err(ApiError::Validation("Hobbies cannot be empty".to_string()));
        }
        if !seen.insert(trimmed.to_lowercase()) {
            return Err(ApiError::Conflict(format!("Duplicate hobby: {}", trimmed)));
        }
        out.push(trimmed);
    }
    Ok(out)
}

fn map_interests(row: &sqlx::sqlite::SqliteRow) -> ApiResult<Interests> {
    let interests_json: String = row.get("categories");
    let hobbies_json: String = row.get("hobbies");
    let updated_at = row
        .get::<Option<String>, _>("updated_at")
        .map(|s| parse_timestamp(&s))
        .transpose()?;

    Ok(Interests {
        student_id: row.get("student_id"),
        interests: serde_json::from_str(&interests_json)
            .map_err(|e| ApiError::Internal(format!("Corrupt interests list: {}", e)))?,
        hobbies: serde_json::from_str(&hobbies_json)
            .map_err(|e| ApiError::Internal(format!("Corrupt hobby list: {}", e)))?,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::seed_student;

    fn pair(category: &str, subcategory: &str) -> InterestPair {
        InterestPair {
            category: category.to_string(),
            subcategory: subcategory.to_string(),
        }
    }

    #[tokio::test]
    async fn read_without_record_returns_default_and_does_not_persist() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        let manager = InterestManager::new(db.clone());

        let record = manager.get_or_default(&student_id).await.unwrap();
        assert!(record.interests.is_empty());
        assert!(record.hobbies.is_empty());
        assert!(record.updated_at.is_none());

        // The read must not have written anything
        let row = sqlx::query("SELECT COUNT(*) as count FROM interests")
            .fetch_one(&db)
            .await
            .unwrap();
        let count: i64 = row.get("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn update_then_read_round_trips() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        let manager = InterestManager::new(db);

        manager
            .update(
                &student_id,
                &UpdateInterestsRequest {
                    interests: vec![pair("Science", "Astronomy")],
                    hobbies: vec!["Chess".to_string()],
                },
            )
            .await
            .unwrap();

        let record = manager.get_or_default(&student_id).await.unwrap();
        assert_eq!(record.interests.len(), 1);
        assert_eq!(record.hobbies, vec!["Chess"]);
        assert!(record.updated_at.is_some());
    }

    #[tokio::test]
    async fn duplicate_pair_within_submission_conflicts() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        let manager = InterestManager::new(db);

        let err = manager
            .update(
                &student_id,
                &UpdateInterestsRequest {
                    interests: vec![pair("Science", "Astronomy"), pair("science", " astronomy ")],
                    hobbies: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_hobby_case_insensitive() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        let manager = InterestManager::new(db);

        let err = manager
            .update(
                &student_id,
                &UpdateInterestsRequest {
                    interests: vec![],
                    hobbies: vec!["Chess".to_string(), " chess".to_string()],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn caps_enforced() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        let manager = InterestManager::new(db);

        let hobbies: Vec<String> = (0..16).map(|i| format!("hobby-{}", i)).collect();
        let err = manager
            .update(
                &student_id,
                &UpdateInterestsRequest {
                    interests: vec![],
                    hobbies,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
