/// Achievement manager
use crate::{
    achievements::{Achievement, AchievementCategory, CreateAchievementRequest},
    db::parse_timestamp,
    error::{ApiError, ApiResult},
};
use chrono::{NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct AchievementManager {
    db: SqlitePool,
}

impl AchievementManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record an achievement. The date must not be in the future and the
    /// (student, title, date) triple must be unique.
    pub async fn create(
        &self,
        student_id: &str,
        req: &CreateAchievementRequest,
    ) -> ApiResult<Achievement> {
        let title = req.title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::Validation("Title cannot be empty".to_string()));
        }

        let today = Utc::now().date_naive();
        if req.date > today {
            return Err(ApiError::Validation(
                "Achievement date cannot be in the future".to_string(),
            ));
        }

        let duplicate = sqlx::query(
            "SELECT COUNT(*) as count FROM achievements
             WHERE student_id = ?1 AND title = ?2 AND achieved_on = ?3",
        )
        .bind(student_id)
        .bind(&title)
        .bind(req.date.to_string())
        .fetch_one(&self.db)
        .await?;
        let count: i64 = duplicate.get("count");
        if count > 0 {
            return Err(ApiError::Conflict(format!(
                "Achievement \"{}\" on {} already recorded",
                title, req.date
            )));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO achievements
                 (id, student_id, category, title, description, achieved_on, place, issuer,
                  created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&id)
        .bind(student_id)
        .bind(req.category.as_str())
        .bind(&title)
        .bind(&req.description)
        .bind(req.date.to_string())
        .bind(&req.place)
        .bind(&req.issuer)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(Achievement {
            id,
            student_id: student_id.to_string(),
            category: req.category,
            title,
            description: req.description.clone(),
            date: req.date,
            place: req.place.clone(),
            issuer: req.issuer.clone(),
            created_at: now,
        })
    }

    /// List a student's achievements, newest first
    pub async fn list_for_student(&self, student_id: &str) -> ApiResult<Vec<Achievement>> {
        let rows = sqlx::query(
            "SELECT * FROM achievements WHERE student_id = ?1 ORDER BY achieved_on DESC",
        )
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(map_achievement).collect()
    }

    /// Get one achievement
    pub async fn get(&self, id: &str) -> ApiResult<Achievement> {
        let row = sqlx::query("SELECT * FROM achievements WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Achievement {} not found", id)))?;
        map_achievement(&row)
    }

    /// Delete one achievement
    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM achievements WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!("Achievement {} not found", id)));
        }
        Ok(())
    }
}

fn map_achievement(row: &sqlx::sqlite::SqliteRow) -> ApiResult<Achievement> {
    let category_str: String = row.get("category");
    let date_str: String = row.get("achieved_on");
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|e| ApiError::Internal(format!("Invalid achievement date: {}", e)))?;

    Ok(Achievement {
        id: row.get("id"),
        student_id: row.get("student_id"),
        category: AchievementCategory::from_str(&category_str)?,
        title: row.get("title"),
        description: row.get("description"),
        date,
        place: row.get("place"),
        issuer: row.get("issuer"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::seed_student;
    use chrono::Duration;

    fn request(title: &str, date: NaiveDate) -> CreateAchievementRequest {
        CreateAchievementRequest {
            category: AchievementCategory::Academic,
            title: title.to_string(),
            description: None,
            date,
            place: Some("1st".to_string()),
            issuer: Some("Ministry of Education".to_string()),
        }
    }

    #[tokio::test]
    async fn create_and_list() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        let manager = AchievementManager::new(db);

        let date = Utc::now().date_naive();
        manager
            .create(&student_id, &request("National Olympiad", date))
            .await
            .unwrap();

        let list = manager.list_for_student(&student_id).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "National Olympiad");
    }

    #[tokio::test]
    async fn future_date_rejected() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        let manager = AchievementManager::new(db);

        let tomorrow = (Utc::now() + Duration::days(1)).date_naive();
        let err = manager
            .create(&student_id, &request("Time travel", tomorrow))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_triple_conflicts() {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "u1").await;
        let manager = AchievementManager::new(db);

        let date = Utc::now().date_naive();
        manager
            .create(&student_id, &request("Chess Cup", date))
            .await
            .unwrap();

        let err = manager
            .create(&student_id, &request("Chess Cup", date))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // Same title on a different date is fine
        let earlier = date - Duration::days(30);
        assert!(manager
            .create(&student_id, &request("Chess Cup", earlier))
            .await
            .is_ok());
    }
}
