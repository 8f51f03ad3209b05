/// Sanction manager
///
/// Reads synthesize the default shape without persisting. Absence updates
/// compare the new total against the critical threshold and publish the
/// outcome; the dispatcher decides which notifications follow.
use crate::{
    db::parse_timestamp,
    error::{ApiError, ApiResult},
    notifications::{DomainEvent, EventBus},
    sanctions::{
        Absences, ActiveSanction, AddSanctionRequest, SanctionRecord, UpdateAbsencesRequest,
        UpdateRemarksRequest, DEFAULT_MAX_ALLOWED,
    },
};
use chrono::{NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct SanctionManager {
    db: SqlitePool,
    bus: EventBus,
}

impl SanctionManager {
    pub fn new(db: SqlitePool, bus: EventBus) -> Self {
        Self { db, bus }
    }

    /// Read the record, or the default shape when none exists. Never writes.
    pub async fn get_or_default(&self, student_id: &str) -> ApiResult<SanctionRecord> {
        let row = sqlx::query("SELECT * FROM sanctions WHERE student_id = ?1")
            .bind(student_id)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => {
                let record_id: String = row.get("id");
                let active = self.list_active(&record_id).await?;
                map_record(&row, active)
            }
            None => Ok(SanctionRecord::default_for(student_id)),
        }
    }

    /// Replace the absence counters. Emits AbsencesUpdated with the delta
    /// and new total so the dispatcher can warn/escalate.
    pub async fn update_absences(
        &self,
        student_id: &str,
        student_user_id: &str,
        req: &UpdateAbsencesRequest,
    ) -> ApiResult<SanctionRecord> {
        let current = self.get_or_default(student_id).await?;
        let previous_total = current.absences.total();

        let max_allowed = req.max_allowed.unwrap_or(current.absences.max_allowed);
        if max_allowed < 0 || req.excused < 0 || req.unexcused < 0 {
            return Err(ApiError::Validation(
                "Absence counters must not be negative".to_string(),
            ));
        }

        let record_id = self.ensure_record(student_id).await?;
        let now = Utc::now();

        sqlx::query(
            "UPDATE sanctions
             SET excused = ?1, unexcused = ?2, max_allowed = ?3, updated_at = ?4
             WHERE id = ?5",
        )
        .bind(req.excused)
        .bind(req.unexcused)
        .bind(max_allowed)
        .bind(now.to_rfc3339())
        .bind(&record_id)
        .execute(&self.db)
        .await?;

        let total = req.excused + req.unexcused;
        self.bus.emit(DomainEvent::AbsencesUpdated {
            student_user_id: student_user_id.to_string(),
            delta: total - previous_total,
            total,
            max_allowed,
        });

        self.get_or_default(student_id).await
    }

    /// Replace the school remark counter
    pub async fn update_remarks(
        &self,
        student_id: &str,
        student_user_id: &str,
        req: &UpdateRemarksRequest,
    ) -> ApiResult<SanctionRecord> {
        if req.schoolo_remarks < 0 {
            return Err(ApiError::Validation(
                "Remark count must not be negative".to_string(),
            ));
        }

        let record_id = self.ensure_record(student_id).await?;
        let now = Utc::now();

        sqlx::query("UPDATE sanctions SET school_remarks = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(req.schoolo_remarks)
            .bind(now.to_rfc3339())
            .bind(&record_id)
            .execute(&self.db)
            .await?;

        self.bus.emit(DomainEvent::RemarksUpdated {
            student_user_id: student_user_id.to_string(),
            count: req.schoolo_remarks,
        });

        self.get_or_default(student_id).await
    }

    /// Append an active sanction
    pub async fn add_sanction(
        &self,
        student_id: &str,
        student_user_id: &str,
        issued_by: &str,
        req: &AddSanctionRequest,
    ) -> ApiResult<ActiveSanction> {
        let kind = req.kind.trim().to_string();
        let reason = req.reason.trim().to_string();
        if kind.is_empty() || reason.is_empty() {
            return Err(ApiError::Validation(
                "Sanction kind and reason cannot be empty".to_string(),
            ));
        }

        if let Some(end) = req.end_date {
            if end < req.start_date {
                return Err(ApiError::Validation(
                    "Sanction end date cannot precede its start date".to_string(),
                ));
            }
        }

        let record_id = self.ensure_record(student_id).await?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO active_sanctions
                 (id, sanction_id, kind, reason, start_date, end_date, issued_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&id)
        .bind(&record_id)
        .bind(&kind)
        .bind(&reason)
        .bind(req.start_date.to_string())
        .bind(req.end_date.map(|d| d.to_string()))
        .bind(issued_by)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        self.bus.emit(DomainEvent::SanctionAdded {
            student_user_id: student_user_id.to_string(),
            kind: kind.clone(),
            reason: reason.clone(),
        });

        Ok(ActiveSanction {
            id,
            kind,
            reason,
            start_date: req.start_date,
            end_date: req.end_date,
            issued_by: issued_by.to_string(),
        })
    }

    /// Remove one active sanction by id. A sanction that exists under a
    /// different student surfaces as a subject mismatch, not NotFound.
    pub async fn remove_sanction(
        &self,
        student_id: &str,
        student_user_id: &str,
        sanction_id: &str,
    ) -> ApiResult<()> {
        let row = sqlx::query(
            "SELECT a.kind as kind, s.student_id as student_id
             FROM active_sanctions a
             JOIN sanctions s ON s.id = a.sanction_id
             WHERE a.id = ?1",
        )
        .bind(sanction_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Sanction {} not found", sanction_id)))?;

        crate::policy::ensure_subject_match(student_id, &row.get::<String, _>("student_id"))?;
        let kind: String = row.get("kind");

        sqlx::query("DELETE FROM active_sanctions WHERE id = ?1")
            .bind(sanction_id)
            .execute(&self.db)
            .await?;

        self.bus.emit(DomainEvent::SanctionRemoved {
            student_user_id: student_user_id.to_string(),
            kind,
        });

        Ok(())
    }

    /// Upsert the container row, returning its id. Write path only.
    async fn ensure_record(&self, student_id: &str) -> ApiResult<String> {
        if let Some(row) = sqlx::query("SELECT id FROM sanctions WHERE student_id = ?1")
            .bind(student_id)
            .fetch_optional(&self.db)
            .await?
        {
            return Ok(row.get("id"));
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO sanctions (id, student_id, excused, unexcused, max_allowed,
                                    school_remarks, updated_at)
             VALUES (?1, ?2, 0, 0, ?3, 0, ?4)",
        )
        .bind(&id)
        .bind(student_id)
        .bind(DEFAULT_MAX_ALLOWED)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;
        Ok(id)
    }

    async fn list_active(&self, record_id: &str) -> ApiResult<Vec<ActiveSanction>> {
        let rows = sqlx::query(
            "SELECT * FROM active_sanctions WHERE sanction_id = ?1 ORDER BY created_at",
        )
        .bind(record_id)
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(map_active).collect()
    }
}

fn map_record(row: &sqlx::sqlite::SqliteRow, active: Vec<ActiveSanction>) -> ApiResult<SanctionRecord> {
    let updated_at = row
        .get::<Option<String>, _>("updated_at")
        .map(|s| parse_timestamp(&s))
        .transpose()?;

    Ok(SanctionRecord {
        student_id: row.get("student_id"),
        absences: Absences {
            excused: row.get("excused"),
            unexcused: row.get("unexcused"),
            max_allowed: row.get("max_allowed"),
        },
        schoolo_remarks: row.get("school_remarks"),
        active_sanctions: active,
        updated_at,
    })
}

fn map_active(row: &sqlx::sqlite::SqliteRow) -> ApiResult<ActiveSanction> {
    let start_str: String = row.get("start_date");
    let start_date = NaiveDate::parse_from_str(&start_str, "%Y-%m-%d")
        .map_err(|e| ApiError::Internal(format!("Invalid sanction start date: {}", e)))?;
    let end_date = row
        .get::<Option<String>, _>("end_date")
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| ApiError::Internal(format!("Invalid sanction end date: {}", e)))
        })
        .transpose()?;

    Ok(ActiveSanction {
        id: row.get("id"),
        kind: row.get("kind"),
        reason: row.get("reason"),
        start_date,
        end_date,
        issued_by: row.get("issued_by"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_staff, seed_student};
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn setup() -> (
        SqlitePool,
        SanctionManager,
        String,
        UnboundedReceiver<DomainEvent>,
    ) {
        let db = crate::db::test_pool().await;
        let student_id = seed_student(&db, "student-1").await;
        seed_staff(&db, "teacher-1", "teacher").await;
        let (bus, rx) = EventBus::channel();
        let manager = SanctionManager::new(db.clone(), bus);
        (db, manager, student_id, rx)
    }

    #[tokio::test]
    async fn read_without_record_returns_default_shape() {
        let (db, manager, student_id, _rx) = setup().await;

        let record = manager.get_or_default(&student_id).await.unwrap();
        assert_eq!(record.absences.excused, 0);
        assert_eq!(record.absences.unexcused, 0);
        assert_eq!(record.absences.max_allowed, DEFAULT_MAX_ALLOWED);
        assert_eq!(record.schoolo_remarks, 0);
        assert!(record.active_sanctions.is_empty());

        // Reads never persist
        let row = sqlx::query("SELECT COUNT(*) as count FROM sanctions")
            .fetch_one(&db)
            .await
            .unwrap();
        let count: i64 = row.get("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn absence_update_emits_delta_and_total() {
        let (_db, manager, student_id, mut rx) = setup().await;

        manager
            .update_absences(
                &student_id,
                "student-1",
                &UpdateAbsencesRequest {
                    excused: 121,
                    unexcused: 0,
                    max_allowed: None,
                },
            )
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            DomainEvent::AbsencesUpdated {
                delta,
                total,
                max_allowed,
                ..
            } => {
                assert_eq!(delta, 121);
                assert_eq!(total, 121);
                assert_eq!(max_allowed, DEFAULT_MAX_ALLOWED);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn decrease_emits_negative_delta() {
        let (_db, manager, student_id, mut rx) = setup().await;

        manager
            .update_absences(
                &student_id,
                "student-1",
                &UpdateAbsencesRequest {
                    excused: 100,
                    unexcused: 0,
                    max_allowed: None,
                },
            )
            .await
            .unwrap();
        let _ = rx.try_recv().unwrap();

        manager
            .update_absences(
                &student_id,
                "student-1",
                &UpdateAbsencesRequest {
                    excused: 90,
                    unexcused: 0,
                    max_allowed: None,
                },
            )
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            DomainEvent::AbsencesUpdated { delta, total, .. } => {
                assert_eq!(delta, -10);
                assert_eq!(total, 90);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn add_and_remove_active_sanction() {
        let (_db, manager, student_id, mut rx) = setup().await;

        let sanction = manager
            .add_sanction(
                &student_id,
                "student-1",
                "teacher-1",
                &AddSanctionRequest {
                    kind: "warning".to_string(),
                    reason: "Repeated lateness".to_string(),
                    start_date: Utc::now().date_naive(),
                    end_date: None,
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            rx.try_recv().unwrap(),
            DomainEvent::SanctionAdded { .. }
        ));

        let record = manager.get_or_default(&student_id).await.unwrap();
        assert_eq!(record.active_sanctions.len(), 1);

        manager
            .remove_sanction(&student_id, "student-1", &sanction.id)
            .await
            .unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            DomainEvent::SanctionRemoved { .. }
        ));

        let record = manager.get_or_default(&student_id).await.unwrap();
        assert!(record.active_sanctions.is_empty());
    }

    #[tokio::test]
    async fn remove_unknown_sanction_is_not_found() {
        let (_db, manager, student_id, _rx) = setup().await;

        let err = manager
            .remove_sanction(&student_id, "student-1", "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn end_before_start_rejected() {
        let (_db, manager, student_id, _rx) = setup().await;

        let start = Utc::now().date_naive();
        let err = manager
            .add_sanction(
                &student_id,
                "student-1",
                "teacher-1",
                &AddSanctionRequest {
                    kind: "suspension".to_string(),
                    reason: "Serious incident".to_string(),
                    start_date: start,
                    end_date: Some(start - chrono::Duration::days(1)),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
