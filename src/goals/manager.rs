/// Goal manager: per-category upsert semantics
use crate::{
    db::parse_timestamp,
    error::{ApiError, ApiResult},
    goals::{category_title, Goal, GoalCategory, UpsertGoalRequest},
};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const MAX_ACTIVITY_LENGTH: usize = 200;

#[derive(Clone)]
pub struct GoalManager {
    db: SqlitePool,
}

impl GoalManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// List a student's goals, one per set category
    pub async fn list_for_student(&self, student_id: &str) -> ApiResult<Vec<Goal>> {
        let rows = sqlx::query("SELECT * FROM goals WHERE student_id = ?1 ORDER BY category")
            .bind(student_id)
            .fetch_all(&self.db)
            .await?;
        rows.iter().map(map_goal).collect()
    }

    /// Get the goal for one category, if set
    pub async fn get_goal(
        &self,
        student_id: &str,
        category: GoalCategory,
    ) -> ApiResult<Option<Goal>> {
        let row = sqlx::query("SELECT * FROM goals WHERE student_id = ?1 AND category = ?2")
            .bind(student_id)
            .bind(category.as_str())
            .fetch_optional(&self.db)
            .await?;
        row.as_ref().map(map_goal).transpose()
    }

    /// Create or update the goal for a (student, category) pair. Repeated
    /// calls update in place; the unique index backs this up under races.
    pub async fn upsert_goal(
        &self,
        student_id: &str,
        category: GoalCategory,
        req: &UpsertGoalRequest,
    ) -> ApiResult<Goal> {
        let activities = normalize_activities(&req.activities)?;
        let activities_json = serde_json::to_string(&activities)
            .map_err(|e| ApiError::Internal(format!("Failed to encode activities: {}", e)))?;
        let now = Utc::now();

        let existing = self.get_goal(student_id, category).await?;
        match existing {
            Some(goal) => {
                sqlx::query(
                    "UPDATE goals SET description = ?1, activities = ?2, updated_at = ?3
                     WHERE id = ?4",
                )
                .bind(&req.description)
                .bind(&activities_json)
                .bind(now.to_rfc3339())
                .bind(&goal.id)
                .execute(&self.db)
                .await?;
            }
            None => {
                let id = Uuid::new_v4().to_string();
                sqlx::query(
                    "INSERT INTO goals (id, student_id, category, description, activities, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .bind(&id)
                .bind(student_id)
                .bind(category.as_str())
                .bind(&req.description)
                .bind(&activities_json)
                .bind(now.to_rfc3339())
                .execute(&self.db)
                .await?;
            }
        }

        self.get_goal(student_id, category)
            .await?
            .ok_or_else(|| ApiError::Internal("Goal vanished after upsert".to_string()))
    }

    /// Clear the goal for one category
    pub async fn delete_goal(&self, student_id: &str, category: GoalCategory) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM goals WHERE student_id = ?1 AND category = ?2")
            .bind(student_id)
            .bind(category.as_str())
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!(
                "No {} goal for student {}",
                category.as_str(),
                student_id
            )));
        }
        Ok(())
    }
}

fn normalize_activities(activities: &[String]) -> ApiResult<Vec<String>> {
    if activities.is_empty() {
        return Err(ApiError::Validation(
            "At least one activity is required".to_string(),
        ));
    }

    let mut normalized = Vec::with_capacity(activities.len());
    for activity in activities {
        let trimmed = activity.trim();
        if trimmed.is_empty() {
            return Err(ApiError::Validation(
                "Activities cannot be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_ACTIVITY_LENGTH {
            return Err(ApiError::Validation(format!(
                "Activities must be at most {} characters",
                MAX_ACTIVITY_LENGTH
            )));
        }
        normalized.push(trimmed.to_string());
    }
    Ok(normalized)
}

fn map_goal(row: &sqlx::sqlite::SqliteRow) -> ApiResult<Goal> {
    let category_str: String = row.get("category");
    let category = GoalCategory::from_str(&category_str)?;
    let activities_json: String = row.get("activities");
    let activities: Vec<String> = serde_json::from_str(&activities_json)
        .map_err(|e| ApiError::Internal(format!("Corrupt activities list: {}", e)))?;
    let updated_at = row
        .get::<Option<String>, _>("updated_at")
        .map(|s| parse_timestamp(&s))
        .transpose()?;

    Ok(Goal {
        id: row.get("id"),
        student_id: row.get("student_id"),
        category,
        title: category_title(category).to_string(),
        description: row.get("description"),
        activities,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::seed_student;

    fn request(activities: &[&str]) -> UpsertGoalRequest {
        UpsertGoalRequest {
            description: Some("why this matters".to_string()),
            activities: activities.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn upsert_is_one_row_per_category() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        let manager = GoalManager::new(db.clone());

        for _ in 0..4 {
            manager
                .upsert_goal(&student_id, GoalCategory::Education, &request(&["read more"]))
                .await
                .unwrap();
        }

        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM goals WHERE student_id = ?1 AND category = 'education'",
        )
        .bind(&student_id)
        .fetch_one(&db)
        .await
        .unwrap();
        let count: i64 = row.get("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn title_comes_from_static_table() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        let manager = GoalManager::new(db);

        let goal = manager
            .upsert_goal(&student_id, GoalCategory::Health, &request(&["run"]))
            .await
            .unwrap();
        assert_eq!(goal.title, "Health & Sport");
    }

    #[tokio::test]
    async fn empty_activity_rejected() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        let manager = GoalManager::new(db);

        let err = manager
            .upsert_goal(&student_id, GoalCategory::Career, &request(&["  "]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = manager
            .upsert_goal(&student_id, GoalCategory::Career, &request(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_missing_goal_is_not_found() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        let manager = GoalManager::new(db);

        let err = manager
            .delete_goal(&student_id, GoalCategory::Hobby)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
