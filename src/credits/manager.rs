/// Credit manager: submission, validation state machine, reference data
use crate::{
    account::Role,
    credits::{
        CreateCreditRequest, Credit, CreditCategory, CreditStatus, Pillar, UpdateCreditRequest,
    },
    db::parse_timestamp,
    error::{ApiError, ApiResult},
    notifications::{DomainEvent, EventBus},
};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct CreditManager {
    db: SqlitePool,
    bus: EventBus,
}

impl CreditManager {
    pub fn new(db: SqlitePool, bus: EventBus) -> Self {
        Self { db, bus }
    }

    /// Submit a new credit for a student.
    ///
    /// Duplicate suppression: an existing credit for the same student with
    /// the same trimmed activity text still pending or already validated
    /// blocks resubmission; a rejected one does not.
    pub async fn create_credit(
        &self,
        student_id: &str,
        req: &CreateCreditRequest,
    ) -> ApiResult<Credit> {
        let activity = req.activity.trim().to_string();
        if activity.is_empty() {
            return Err(ApiError::Validation("Activity cannot be empty".to_string()));
        }

        let duplicate = sqlx::query(
            "SELECT COUNT(*) as count FROM credits
             WHERE student_id = ?1 AND TRIM(activity) = ?2
               AND status IN ('pending', 'validated')",
        )
        .bind(student_id)
        .bind(&activity)
        .fetch_one(&self.db)
        .await?;
        let count: i64 = duplicate.get("count");
        if count > 0 {
            return Err(ApiError::Conflict(format!(
                "A credit for \"{}\" is already pending or validated",
                activity
            )));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO credits (id, student_id, pillar, activity, description, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
        )
        .bind(&id)
        .bind(student_id)
        .bind(req.pillar.as_str())
        .bind(&activity)
        .bind(&req.description)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(Credit {
            id,
            student_id: student_id.to_string(),
            pillar: req.pillar,
            activity,
            description: req.description.clone(),
            status: CreditStatus::Pending,
            validated_by: None,
            validation_date: None,
            created_at: now,
        })
    }

    /// Get one credit
    pub async fn get_credit(&self, id: &str) -> ApiResult<Credit> {
        let row = sqlx::query("SELECT * FROM credits WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Credit {} not found", id)))?;
        map_credit(&row)
    }

    /// List a student's credits, newest first
    pub async fn list_for_student(&self, student_id: &str) -> ApiResult<Vec<Credit>> {
        let rows = sqlx::query(
            "SELECT * FROM credits WHERE student_id = ?1 ORDER BY created_at DESC",
        )
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(map_credit).collect()
    }

    /// List every credit (staff views), optionally filtered by status
    pub async fn list_all(&self, status: Option<CreditStatus>) -> ApiResult<Vec<Credit>> {
        let rows = match status {
            Some(status) => {
                sqlx::query("SELECT * FROM credits WHERE status = ?1 ORDER BY created_at DESC")
                    .bind(status.as_str())
                    .fetch_all(&self.db)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM credits ORDER BY created_at DESC")
                    .fetch_all(&self.db)
                    .await?
            }
        };
        rows.iter().map(map_credit).collect()
    }

    /// Owner edit of a pending credit. Admin may edit regardless of state.
    pub async fn update_credit(
        &self,
        id: &str,
        req: &UpdateCreditRequest,
        actor_role: Role,
    ) -> ApiResult<Credit> {
        let current = self.get_credit(id).await?;

        if current.status != CreditStatus::Pending && actor_role != Role::Admin {
            return Err(ApiError::Conflict(
                "Only pending credits can be edited".to_string(),
            ));
        }

        let pillar = req.pillar.unwrap_or(current.pillar);
        let activity = req
            .activity
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.activity)
            .to_string();
        let description = req
            .description
            .clone()
            .or_else(|| current.description.clone());
        let now = Utc::now();

        sqlx::query(
            "UPDATE credits SET pillar = ?1, activity = ?2, description = ?3, updated_at = ?4
             WHERE id = ?5",
        )
        .bind(pillar.as_str())
        .bind(&activity)
        .bind(&description)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.db)
        .await?;

        self.get_credit(id).await
    }

    /// Validate or reject a pending credit.
    ///
    /// Only pending credits can be decided; an admin may additionally flip a
    /// decided credit between validated and rejected. Nothing goes back to
    /// pending. Emits the decision to the notification bus.
    pub async fn decide_credit(
        &self,
        id: &str,
        decision: CreditStatus,
        validator_user_id: &str,
        validator_role: Role,
        student_user_id: &str,
    ) -> ApiResult<Credit> {
        if decision == CreditStatus::Pending {
            return Err(ApiError::Validation(
                "A credit cannot be returned to pending".to_string(),
            ));
        }

        let current = self.get_credit(id).await?;

        if current.status != CreditStatus::Pending && validator_role != Role::Admin {
            return Err(ApiError::Conflict(format!(
                "Credit is already {}",
                current.status.as_str()
            )));
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE credits SET status = ?1, validated_by = ?2, validation_date = ?3,
                                updated_at = ?3
             WHERE id = ?4",
        )
        .bind(decision.as_str())
        .bind(validator_user_id)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.db)
        .await?;

        crate::metrics::CREDIT_DECISIONS
            .with_label_values(&[decision.as_str()])
            .inc();

        self.bus.emit(DomainEvent::CreditDecided {
            credit_id: id.to_string(),
            student_user_id: student_user_id.to_string(),
            activity: current.activity.clone(),
            validated: decision == CreditStatus::Validated,
        });

        self.get_credit(id).await
    }

    /// Delete a credit. A validated credit survives its owner's delete
    /// (Conflict); only an admin removes it.
    pub async fn delete_credit(&self, id: &str, actor_role: Role) -> ApiResult<()> {
        let current = self.get_credit(id).await?;

        if current.status == CreditStatus::Validated && actor_role != Role::Admin {
            return Err(ApiError::Conflict(
                "A validated credit cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM credits WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    // ----- Reference data -----

    /// List credit categories, optionally per pillar
    pub async fn list_categories(&self, pillar: Option<Pillar>) -> ApiResult<Vec<CreditCategory>> {
        let rows = match pillar {
            Some(p) => {
                sqlx::query("SELECT * FROM credit_categories WHERE pillar = ?1 ORDER BY name")
                    .bind(p.as_str())
                    .fetch_all(&self.db)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM credit_categories ORDER BY pillar, name")
                    .fetch_all(&self.db)
                    .await?
            }
        };
        rows.iter().map(map_category).collect()
    }

    /// Create a category (admin reference-data maintenance)
    pub async fn create_category(
        &self,
        pillar: Pillar,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<CreditCategory> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("Name cannot be empty".to_string()));
        }

        let existing = sqlx::query(
            "SELECT COUNT(*) as count FROM credit_categories WHERE pillar = ?1 AND name = ?2",
        )
        .bind(pillar.as_str())
        .bind(name)
        .fetch_one(&self.db)
        .await?;
        let count: i64 = existing.get("count");
        if count > 0 {
            return Err(ApiError::Conflict(format!(
                "Category \"{}\" already exists for pillar {}",
                name,
                pillar.as_str()
            )));
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO credit_categories (id, pillar, name, description)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&id)
        .bind(pillar.as_str())
        .bind(name)
        .bind(description)
        .execute(&self.db)
        .await?;

        Ok(CreditCategory {
            id,
            pillar,
            name: name.to_string(),
            description: description.map(str::to_string),
        })
    }
}

fn map_credit(row: &sqlx::sqlite::SqliteRow) -> ApiResult<Credit> {
    let pillar_str: String = row.get("pillar");
    let status_str: String = row.get("status");
    let validation_date = row
        .get::<Option<String>, _>("validation_date")
        .map(|s| parse_timestamp(&s))
        .transpose()?;

    Ok(Credit {
        id: row.get("id"),
        student_id: row.get("student_id"),
        pillar: Pillar::from_str(&pillar_str)?,
        activity: row.get("activity"),
        description: row.get("description"),
        status: CreditStatus::from_str(&status_str)?,
        validated_by: row.get("validated_by"),
        validation_date,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn map_category(row: &sqlx::sqlite::SqliteRow) -> ApiResult<CreditCategory> {
    let pillar_str: String = row.get("pillar");
    Ok(CreditCategory {
        id: row.get("id"),
        pillar: Pillar::from_str(&pillar_str)?,
        name: row.get("name"),
        description: row.get("description"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_staff, seed_student};

    async fn setup() -> (SqlitePool, CreditManager, String) {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "student-1").await;
        seed_staff(&db, "teacher-1", "teacher").await;
        seed_staff(&db, "admin-1", "admin").await;
        let (bus, _rx) = EventBus::channel();
        let manager = CreditManager::new(db.clone(), bus);
        (db, manager, student_id)
    }

    fn submission(activity: &str) -> CreateCreditRequest {
        CreateCreditRequest {
            pillar: Pillar::Thinking,
            activity: activity.to_string(),
            description: Some("description".to_string()),
        }
    }

    #[tokio::test]
    async fn create_starts_pending() {
        let (_db, manager, student_id) = setup().await;
        let credit = manager
            .create_credit(&student_id, &submission("Math Olympiad"))
            .await
            .unwrap();
        assert_eq!(credit.status, CreditStatus::Pending);
        assert_eq!(credit.pillar, Pillar::Thinking);
    }

    #[tokio::test]
    async fn duplicate_activity_suppressed_until_rejected() {
        let (_db, manager, student_id) = setup().await;
        manager
            .create_credit(&student_id, &submission("Math Olympiad"))
            .await
            .unwrap();

        // Same trimmed text collides while pending
        let err = manager
            .create_credit(&student_id, &submission("  Math Olympiad  "))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn resubmission_allowed_after_rejection() {
        let (_db, manager, student_id) = setup().await;
        let credit = manager
            .create_credit(&student_id, &submission("Science Fair"))
            .await
            .unwrap();

        manager
            .decide_credit(
                &credit.id,
                CreditStatus::Rejected,
                "teacher-1",
                Role::Teacher,
                "student-1",
            )
            .await
            .unwrap();

        assert!(manager
            .create_credit(&student_id, &submission("Science Fair"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn validation_stamps_validator_and_date() {
        let (_db, manager, student_id) = setup().await;
        let credit = manager
            .create_credit(&student_id, &submission("Math Olympiad"))
            .await
            .unwrap();

        let decided = manager
            .decide_credit(
                &credit.id,
                CreditStatus::Validated,
                "teacher-1",
                Role::Teacher,
                "student-1",
            )
            .await
            .unwrap();

        assert_eq!(decided.status, CreditStatus::Validated);
        assert_eq!(decided.validated_by.as_deref(), Some("teacher-1"));
        assert!(decided.validation_date.is_some());
    }

    #[tokio::test]
    async fn decided_credit_is_terminal_for_teacher() {
        let (_db, manager, student_id) = setup().await;
        let credit = manager
            .create_credit(&student_id, &submission("Math Olympiad"))
            .await
            .unwrap();

        manager
            .decide_credit(
                &credit.id,
                CreditStatus::Validated,
                "teacher-1",
                Role::Teacher,
                "student-1",
            )
            .await
            .unwrap();

        let err = manager
            .decide_credit(
                &credit.id,
                CreditStatus::Rejected,
                "teacher-1",
                Role::Teacher,
                "student-1",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // Admin override between decided states is allowed
        assert!(manager
            .decide_credit(
                &credit.id,
                CreditStatus::Rejected,
                "admin-1",
                Role::Admin,
                "student-1",
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn nothing_returns_to_pending() {
        let (_db, manager, student_id) = setup().await;
        let credit = manager
            .create_credit(&student_id, &submission("Math Olympiad"))
            .await
            .unwrap();

        let err = manager
            .decide_credit(
                &credit.id,
                CreditStatus::Pending,
                "admin-1",
                Role::Admin,
                "student-1",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn validated_credit_deletable_only_by_admin() {
        let (_db, manager, student_id) = setup().await;
        let credit = manager
            .create_credit(&student_id, &submission("Math Olympiad"))
            .await
            .unwrap();
        manager
            .decide_credit(
                &credit.id,
                CreditStatus::Validated,
                "teacher-1",
                Role::Teacher,
                "student-1",
            )
            .await
            .unwrap();

        let err = manager
            .delete_credit(&credit.id, Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        manager.delete_credit(&credit.id, Role::Admin).await.unwrap();
        assert!(manager.get_credit(&credit.id).await.is_err());
    }

    #[tokio::test]
    async fn category_unique_per_pillar() {
        let (_db, manager, _student_id) = setup().await;
        manager
            .create_category(Pillar::Thinking, "Debate", None)
            .await
            .unwrap();

        let err = manager
            .create_category(Pillar::Thinking, "Debate", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // Same name under another pillar is fine
        assert!(manager
            .create_category(Pillar::Character, "Debate", None)
            .await
            .is_ok());
    }
}
