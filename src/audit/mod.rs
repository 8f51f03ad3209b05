/// Append-only audit trail
use crate::error::ApiResult;
use chrono::Utc;
use sqlx::SqlitePool;

/// Recordable audit actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Read,
    Update,
    Delete,
    Login,
    Logout,
    Register,
    PasswordChange,
    PasswordReset,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Read => "read",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Login => "login",
            AuditAction::Logout => "logout",
            AuditAction::Register => "register",
            AuditAction::PasswordChange => "password_change",
            AuditAction::PasswordReset => "password_reset",
        }
    }
}

/// Request metadata captured alongside each entry
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone)]
pub struct AuditLogger {
    db: SqlitePool,
}

impl AuditLogger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append one entry. Failures are logged and swallowed: audit loss must
    /// never fail the audited operation.
    pub async fn log(
        &self,
        user_id: Option<&str>,
        action: AuditAction,
        entity: &str,
        entity_id: Option<&str>,
        details: Option<&str>,
        meta: &RequestMeta,
    ) {
        if let Err(e) = self
            .insert(user_id, action, entity, entity_id, details, meta)
            .await
        {
            tracing::warn!("Failed to write audit entry: {}", e);
        }
    }

    async fn insert(
        &self,
        user_id: Option<&str>,
        action: AuditAction,
        entity: &str,
        entity_id: Option<&str>,
        details: Option<&str>,
        meta: &RequestMeta,
    ) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO audit_log (user_id, action, entity, entity_id, details, ip, user_agent,
                                    timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(user_id)
        .bind(action.as_str())
        .bind(entity)
        .bind(entity_id)
        .bind(details)
        .bind(&meta.ip)
        .bind(&meta.user_agent)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[test]
    fn action_names_match_the_wire_format() {
        let cases = [
            (AuditAction::Create, "create"),
            (AuditAction::Read, "read"),
            (AuditAction::Update, "update"),
            (AuditAction::Delete, "delete"),
            (AuditAction::Login, "login"),
            (AuditAction::Logout, "logout"),
            (AuditAction::Register, "register"),
            (AuditAction::PasswordChange, "password_change"),
            (AuditAction::PasswordReset, "password_reset"),
        ];
        for (action, expected) in cases {
            assert_eq!(action.as_str(), expected);
        }
    }

    #[tokio::test]
    async fn entries_are_appended() {
        let db = crate::db::test_pool().await;
        let logger = AuditLogger::new(db.clone());

        logger
            .log(
                Some("u1"),
                AuditAction::Login,
                "User",
                Some("u1"),
                None,
                &RequestMeta {
                    ip: Some("127.0.0.1".into()),
                    user_agent: Some("test".into()),
                },
            )
            .await;

        let row = sqlx::query("SELECT COUNT(*) as count FROM audit_log WHERE action = 'login'")
            .fetch_one(&db)
            .await
            .unwrap();
        let count: i64 = row.get("count");
        assert_eq!(count, 1);
    }
}
