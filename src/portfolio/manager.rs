/// Portfolio manager
///
/// Reads synthesize the default shape without persisting. The mentor must
/// hold a staff role; recommendation authors are unique per portfolio.
use crate::{
    account::Role,
    db::parse_timestamp,
    error::{ApiError, ApiResult},
    portfolio::{
        AddRecommendationRequest, Portfolio, Recommendation, UpdatePortfolioRequest,
        MAX_RECOMMENDATIONS,
    },
};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct PortfolioManager {
    db: SqlitePool,
}

impl PortfolioManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Read the portfolio, or the default shape when none exists. Never writes.
    pub async fn get_or_default(&self, student_id: &str) -> ApiResult<Portfolio> {
        let row = sqlx::query("SELECT * FROM portfolios WHERE student_id = ?1")
            .bind(student_id)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => {
                let portfolio_id: String = row.get("id");
                let recommendations = self.list_recommendations(&portfolio_id).await?;
                map_portfolio(&row, recommendations)
            }
            None => Ok(Portfolio::default_for(student_id)),
        }
    }

    /// Update narrative fields and mentor
    pub async fn update(
        &self,
        student_id: &str,
        req: &UpdatePortfolioRequest,
    ) -> ApiResult<Portfolio> {
        if let Some(mentor_id) = &req.mentor_id {
            self.ensure_mentor_eligible(mentor_id).await?;
        }

        let current = self.get_or_default(student_id).await?;
        let experience = req
            .experience
            .clone()
            .unwrap_or_else(|| current.experience.clone());
        let projects = req
            .projects
            .clone()
            .unwrap_or_else(|| current.projects.clone());
        let mentor_id = req.mentor_id.clone().or_else(|| current.mentor_id.clone());

        let portfolio_id = self.ensure_record(student_id).await?;
        let now = Utc::now();

        sqlx::query(
            "UPDATE portfolios SET experience = ?1, projects = ?2, mentor_id = ?3, updated_at = ?4
             WHERE id = ?5",
        )
        .bind(&experience)
        .bind(&projects)
        .bind(&mentor_id)
        .bind(now.to_rfc3339())
        .bind(&portfolio_id)
        .execute(&self.db)
        .await?;

        self.get_or_default(student_id).await
    }

    /// Add a recommendation. One per distinct author (case-insensitive,
    /// trimmed), at most ten in total.
    pub async fn add_recommendation(
        &self,
        student_id: &str,
        req: &AddRecommendationRequest,
    ) -> ApiResult<Recommendation> {
        let text = req.text.trim().to_string();
        let author = req.author.trim().to_string();
        if text.is_empty() || author.is_empty() {
            return Err(ApiError::Validation(
                "Recommendation text and author cannot be empty".to_string(),
            ));
        }

        let portfolio_id = self.ensure_record(student_id).await?;
        let existing = self.list_recommendations(&portfolio_id).await?;

        if existing.len() >= MAX_RECOMMENDATIONS {
            return Err(ApiError::Conflict(format!(
                "At most {} recommendations allowed",
                MAX_RECOMMENDATIONS
            )));
        }

        let author_key = author.to_lowercase();
        if existing
            .iter()
            .any(|r| r.author.trim().to_lowercase() == author_key)
        {
            return Err(ApiError::Conflict(format!(
                "A recommendation from {} already exists",
                author
            )));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO recommendations (id, portfolio_id, text, author, created_on)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&id)
        .bind(&portfolio_id)
        .bind(&text)
        .bind(&author)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(Recommendation {
            id,
            text,
            author,
            date: now,
        })
    }

    /// Remove a recommendation by id. One that exists under a different
    /// student's portfolio surfaces as a subject mismatch, not NotFound.
    pub async fn remove_recommendation(
        &self,
        student_id: &str,
        recommendation_id: &str,
    ) -> ApiResult<()> {
        let row = sqlx::query(
            "SELECT p.student_id as student_id
             FROM recommendations r
             JOIN portfolios p ON p.id = r.portfolio_id
             WHERE r.id = ?1",
        )
        .bind(recommendation_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Recommendation {} not found", recommendation_id))
        })?;

        crate::policy::ensure_subject_match(student_id, &row.get::<String, _>("student_id"))?;

        sqlx::query("DELETE FROM recommendations WHERE id = ?1")
            .bind(recommendation_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn ensure_mentor_eligible(&self, mentor_id: &str) -> ApiResult<()> {
        let row = sqlx::query("SELECT role FROM users WHERE id = ?1")
            .bind(mentor_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Mentor {} not found", mentor_id)))?;

        let role = Role::from_str(&row.get::<String, _>("role"))?;
        if !role.is_staff() {
            return Err(ApiError::Validation(
                "Mentor must be a teacher or admin".to_string(),
            ));
        }
        Ok(())
    }

    /// Upsert the container row, returning its id. Write path only.
    async fn ensure_record(&self, student_id: &str) -> ApiResult<String> {
        if let Some(row) = sqlx::query("SELECT id FROM portfolios WHERE student_id = ?1")
            .bind(student_id)
            .fetch_optional(&self.db)
            .await?
        {
            return Ok(row.get("id"));
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO portfolios (id, student_id, experience, projects, updated_at)
             VALUES (?1, ?2, '', '', ?3)",
        )
        .bind(&id)
        .bind(student_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;
        Ok(id)
    }

    async fn list_recommendations(&self, portfolio_id: &str) -> ApiResult<Vec<Recommendation>> {
        let rows = sqlx::query(
            "SELECT * FROM recommendations WHERE portfolio_id = ?1 ORDER BY created_on",
        )
        .bind(portfolio_id)
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(map_recommendation).collect()
    }
}

fn map_portfolio(
    row: &sqlx::sqlite::SqliteRow,
    recommendations: Vec<Recommendation>,
) -> ApiResult<Portfolio> {
    let updated_at = row
        .get::<Option<String>, _>("updated_at")
        .map(|s| parse_timestamp(&s))
        .transpose()?;

    Ok(Portfolio {
        student_id: row.get("student_id"),
        experience: row.get("experience"),
        projects: row.get("projects"),
        mentor_id: row.get("mentor_id"),
        recommendations,
        updated_at,
    })
}

fn map_recommendation(row: &sqlx::sqlite::SqliteRow) -> ApiResult<Recommendation> {
    Ok(Recommendation {
        id: row.get("id"),
        text: row.get("text"),
        author: row.get("author"),
        date: parse_timestamp(&row.get::<String, _>("created_on"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_staff, seed_student};

    async fn setup() -> (SqlitePool, PortfolioManager, String) {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "student-1").await;
        seed_staff(&db, "teacher-1", "teacher").await;
        let manager = PortfolioManager::new(db.clone());
        (db, manager, student_id)
    }

    #[tokio::test]
    async fn read_without_record_returns_default_and_does_not_persist() {
        let (db, manager, student_id) = setup().await;

        let portfolio = manager.get_or_default(&student_id).await.unwrap();
        assert_eq!(portfolio.experience, "");
        assert!(portfolio.recommendations.is_empty());
        assert!(portfolio.updated_at.is_none());

        let row = sqlx::query("SELECT COUNT(*) as count FROM portfolios")
            .fetch_one(&db)
            .await
            .unwrap();
        let count: i64 = row.get("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn mentor_must_be_staff() {
        let (db, manager, student_id) = setup().await;
        seed_student(&db, "student-2").await;

        let err = manager
            .update(
                &student_id,
                &UpdatePortfolioRequest {
                    experience: None,
                    projects: None,
                    mentor_id: Some("student-2".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        assert!(manager
            .update(
                &student_id,
                &UpdatePortfolioRequest {
                    experience: Some("Built a robot".to_string()),
                    projects: None,
                    mentor_id: Some("teacher-1".to_string()),
                },
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn duplicate_author_conflicts() {
        let (_db, manager, student_id) = setup().await;

        manager
            .add_recommendation(
                &student_id,
                &AddRecommendationRequest {
                    text: "Excellent student".to_string(),
                    author: "Maria Ivanova".to_string(),
                },
            )
            .await
            .unwrap();

        let err = manager
            .add_recommendation(
                &student_id,
                &AddRecommendationRequest {
                    text: "Again".to_string(),
                    author: "  maria ivanova ".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn recommendation_cap_enforced() {
        let (_db, manager, student_id) = setup().await;

        for i in 0..MAX_RECOMMENDATIONS {
            manager
                .add_recommendation(
                    &student_id,
                    &AddRecommendationRequest {
                        text: "Great work".to_string(),
                        author: format!("Author {}", i),
                    },
                )
                .await
                .unwrap();
        }

        let err = manager
            .add_recommendation(
                &student_id,
                &AddRecommendationRequest {
                    text: "One too many".to_string(),
                    author: "Author 11".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn remove_recommendation_by_id() {
        let (_db, manager, student_id) = setup().await;

        let rec = manager
            .add_recommendation(
                &student_id,
                &AddRecommendationRequest {
                    text: "Excellent student".to_string(),
                    author: "Maria Ivanova".to_string(),
                },
            )
            .await
            .unwrap();

        manager
            .remove_recommendation(&student_id, &rec.id)
            .await
            .unwrap();

        let portfolio = manager.get_or_default(&student_id).await.unwrap();
        assert!(portfolio.recommendations.is_empty());
    }
}
