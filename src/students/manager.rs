/// Student profile manager
use crate::{
    db::parse_timestamp,
    error::{ApiError, ApiResult},
    students::{CreateProfileRequest, StudentProfile, UpdateProfileRequest},
};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct StudentManager {
    db: SqlitePool,
}

impl StudentManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a profile for a user. At most one profile per user.
    pub async fn create_profile(
        &self,
        user_id: &str,
        req: &CreateProfileRequest,
    ) -> ApiResult<StudentProfile> {
        if self.find_by_user(user_id).await?.is_some() {
            return Err(ApiError::Conflict(
                "Student profile already exists for this user".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO student_profiles
                 (id, user_id, grade, specialization, average_grade, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(req.grade)
        .bind(&req.specialization)
        .bind(req.average_grade)
        .bind(&req.image_url)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(StudentProfile {
            id,
            user_id: user_id.to_string(),
            grade: req.grade,
            specialization: req.specialization.clone(),
            average_grade: req.average_grade,
            image_url: req.image_url.clone(),
            created_at: now,
        })
    }

    /// Get a profile by its id
    pub async fn get_profile(&self, id: &str) -> ApiResult<StudentProfile> {
        let row = sqlx::query("SELECT * FROM student_profiles WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Student {} not found", id)))?;
        map_profile(&row)
    }

    /// Get a profile by the owning user id
    pub async fn get_by_user(&self, user_id: &str) -> ApiResult<StudentProfile> {
        self.find_by_user(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("No student profile for user {}", user_id)))
    }

    async fn find_by_user(&self, user_id: &str) -> ApiResult<Option<StudentProfile>> {
        let row = sqlx::query("SELECT * FROM student_profiles WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        row.as_ref().map(map_profile).transpose()
    }

    /// List all profiles (staff dashboards)
    pub async fn list_profiles(&self) -> ApiResult<Vec<StudentProfile>> {
        let rows = sqlx::query("SELECT * FROM student_profiles ORDER BY created_at")
            .fetch_all(&self.db)
            .await?;
        rows.iter().map(map_profile).collect()
    }

    /// Update fields present in the request
    pub async fn update_profile(
        &self,
        id: &str,
        req: &UpdateProfileRequest,
    ) -> ApiResult<StudentProfile> {
        let current = self.get_profile(id).await?;

        let grade = req.grade.unwrap_or(current.grade);
        let specialization = req
            .specialization
            .clone()
            .or_else(|| current.specialization.clone());
        let average_grade = req.average_grade.or(current.average_grade);
        let image_url = req.image_url.clone().or_else(|| current.image_url.clone());
        let now = Utc::now();

        sqlx::query(
            "UPDATE student_profiles
             SET grade = ?1, specialization = ?2, average_grade = ?3, image_url = ?4,
                 updated_at = ?5
             WHERE id = ?6",
        )
        .bind(grade)
        .bind(&specialization)
        .bind(average_grade)
        .bind(&image_url)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.db)
        .await?;

        self.get_profile(id).await
    }

    /// Delete a profile and the records hanging off it (admin only, enforced
    /// by policy upstream)
    pub async fn delete_profile(&self, id: &str) -> ApiResult<()> {
        let profile = self.get_profile(id).await?;

        // Child rows first; SQLite enforces the foreign keys
        sqlx::query("DELETE FROM credits WHERE student_id = ?1")
            .bind(&profile.id)
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM goals WHERE student_id = ?1")
            .bind(&profile.id)
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM interests WHERE student_id = ?1")
            .bind(&profile.id)
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM achievements WHERE student_id = ?1")
            .bind(&profile.id)
            .execute(&self.db)
            .await?;
        sqlx::query(
            "DELETE FROM active_sanctions
             WHERE sanction_id IN (SELECT id FROM sanctions WHERE student_id = ?1)",
        )
        .bind(&profile.id)
        .execute(&self.db)
        .await?;
        sqlx::query("DELETE FROM sanctions WHERE student_id = ?1")
            .bind(&profile.id)
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM event_participations WHERE student_id = ?1")
            .bind(&profile.id)
            .execute(&self.db)
            .await?;
        sqlx::query(
            "DELETE FROM recommendations
             WHERE portfolio_id IN (SELECT id FROM portfolios WHERE student_id = ?1)",
        )
        .bind(&profile.id)
        .execute(&self.db)
        .await?;
        sqlx::query("DELETE FROM portfolios WHERE student_id = ?1")
            .bind(&profile.id)
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM student_profiles WHERE id = ?1")
            .bind(&profile.id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Resolve the owning user id for a profile
    pub async fn owner_user_id(&self, student_id: &str) -> ApiResult<String> {
        let profile = self.get_profile(student_id).await?;
        Ok(profile.user_id)
    }
}

fn map_profile(row: &sqlx::sqlite::SqliteRow) -> ApiResult<StudentProfile> {
    Ok(StudentProfile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        grade: row.get("grade"),
        specialization: row.get("specialization"),
        average_grade: row.get("average_grade"),
        image_url: row.get("image_url"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}
