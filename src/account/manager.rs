/// Account manager: registration, login, sessions and password reset
use crate::{
    account::{Role, Session, User, ValidatedSession},
    config::ServerConfig,
    db::parse_timestamp,
    error::{ApiError, ApiResult},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Register a new user account
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        role: Role,
    ) -> ApiResult<User> {
        let email = email.trim().to_ascii_lowercase();

        if self.email_exists(&email).await? {
            return Err(ApiError::Conflict(format!(
                "Email {} is already registered",
                email
            )));
        }

        let password_hash = hash_password(password)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&password_hash)
        .bind(first_name)
        .bind(last_name)
        .bind(role.as_str())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(User {
            id,
            email,
            password_hash,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role,
            locked: false,
            failed_attempts: 0,
            totp_enabled: false,
            created_at: now,
        })
    }

    /// Authenticate and create a session
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<(User, Session)> {
        let user = self
            .get_user_by_email(email)
            .await
            .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

        if user.locked {
            return Err(ApiError::AccountLocked(
                "Account is locked after too many failed logins".to_string(),
            ));
        }

        if !verify_password(password, &user.password_hash)? {
            self.record_failed_attempt(&user).await?;
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }

        // Successful login resets the failure counter
        if user.failed_attempts > 0 {
            sqlx::query("UPDATE users SET failed_attempts = 0 WHERE id = ?1")
                .bind(&user.id)
                .execute(&self.db)
                .await?;
        }

        let session = self.create_session(&user.id).await?;
        Ok((user, session))
    }

    async fn record_failed_attempt(&self, user: &User) -> ApiResult<()> {
        let attempts = user.failed_attempts + 1;
        let lock = attempts >= self.config.authentication.max_failed_attempts;

        sqlx::query("UPDATE users SET failed_attempts = ?1, locked = ?2 WHERE id = ?3")
            .bind(attempts)
            .bind(lock)
            .bind(&user.id)
            .execute(&self.db)
            .await?;

        if lock {
            tracing::warn!("Account {} locked after {} failed logins", user.email, attempts);
        }

        Ok(())
    }

    /// Create a session for a user
    pub async fn create_session(&self, user_id: &str) -> ApiResult<Session> {
        let session_id = Uuid::new_v4().to_string();
        let token = self.generate_access_token(user_id, &session_id)?;

        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.config.authentication.token_ttl);

        sqlx::query(
            "INSERT INTO sessions (id, user_id, token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&session_id)
        .bind(user_id)
        .bind(&token)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(Session {
            id: session_id,
            user_id: user_id.to_string(),
            token,
            created_at: now,
            expires_at,
        })
    }

    /// Validate access token and return session info
    pub async fn validate_access_token(&self, token: &str) -> ApiResult<ValidatedSession> {
        let row = sqlx::query("SELECT id, user_id, expires_at FROM sessions WHERE token = ?1")
            .bind(token)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

        let expires_at = parse_timestamp(&row.get::<String, _>("expires_at"))?;
        if expires_at < Utc::now() {
            return Err(ApiError::Unauthorized("Token has expired".to_string()));
        }

        let user_id: String = row.get("user_id");
        let user = self.get_user(&user_id).await?;
        if user.locked {
            return Err(ApiError::AccountLocked("Account is locked".to_string()));
        }

        Ok(ValidatedSession {
            user_id,
            session_id: row.get("id"),
            role: user.role,
        })
    }

    /// Delete a session (logout)
    pub async fn delete_session(&self, session_id: &str) -> ApiResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Get a user by id
    pub async fn get_user(&self, id: &str) -> ApiResult<User> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, first_name, last_name, role, locked,
                    failed_attempts, totp_enabled, created_at
             FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;

        map_user(&row)
    }

    /// Get a user by email
    pub async fn get_user_by_email(&self, email: &str) -> ApiResult<User> {
        let email = email.trim().to_ascii_lowercase();
        let row = sqlx::query(
            "SELECT id, email, password_hash, first_name, last_name, role, locked,
                    failed_attempts, totp_enabled, created_at
             FROM users WHERE email = ?1",
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", email)))?;

        map_user(&row)
    }

    async fn email_exists(&self, email: &str) -> ApiResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    /// Generate a password reset token for the given email.
    /// Returns the token; the caller mails it best-effort.
    pub async fn generate_password_reset_token(&self, email: &str) -> ApiResult<String> {
        let user = self.get_user_by_email(email).await?;

        let token = generate_random_string(48);
        let expires = Utc::now() + Duration::hours(1);

        sqlx::query("UPDATE users SET reset_token = ?1, reset_token_expires = ?2 WHERE id = ?3")
            .bind(&token)
            .bind(expires.to_rfc3339())
            .bind(&user.id)
            .execute(&self.db)
            .await?;

        Ok(token)
    }

    /// Reset password using a previously issued token. Single use: the token
    /// is cleared on success, and the lockout state resets with it.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ApiResult<()> {
        let row = sqlx::query("SELECT id, reset_token_expires FROM users WHERE reset_token = ?1")
            .bind(token)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid or expired reset token".to_string()))?;

        let expires = parse_timestamp(&row.get::<String, _>("reset_token_expires"))?;
        if expires < Utc::now() {
            return Err(ApiError::Unauthorized(
                "Invalid or expired reset token".to_string(),
            ));
        }

        let user_id: String = row.get("id");
        let password_hash = hash_password(new_password)?;

        sqlx::query(
            "UPDATE users
             SET password_hash = ?1, reset_token = NULL, reset_token_expires = NULL,
                 failed_attempts = 0, locked = 0
             WHERE id = ?2",
        )
        .bind(&password_hash)
        .bind(&user_id)
        .execute(&self.db)
        .await?;

        // Invalidate existing sessions for the account
        sqlx::query("DELETE FROM sessions WHERE user_id = ?1")
            .bind(&user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Cleanup expired sessions. Returns the number of rows removed.
    pub async fn cleanup_expired_sessions(&self) -> ApiResult<u64> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?1")
            .bind(&now)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Clear reset tokens past their expiry
    pub async fn cleanup_expired_reset_tokens(&self) -> ApiResult<u64> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE users SET reset_token = NULL, reset_token_expires = NULL
             WHERE reset_token IS NOT NULL AND reset_token_expires < ?1",
        )
        .bind(&now)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Generate access JWT token
    fn generate_access_token(&self, user_id: &str, session_id: &str) -> ApiResult<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        use serde::{Deserialize, Serialize};

        #[derive(Debug, Serialize, Deserialize)]
        struct Claims {
            sub: String,
            sid: String,
            iat: i64,
            exp: i64,
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            iat: now,
            exp: now + self.config.authentication.token_ttl,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Jwt(format!("Failed to generate token: {}", e)))?;

        Ok(token)
    }
}

fn map_user(row: &sqlx::sqlite::SqliteRow) -> ApiResult<User> {
    let role_str: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        role: Role::from_str(&role_str)?,
        locked: row.get("locked"),
        failed_attempts: row.get("failed_attempts"),
        totp_enabled: row.get("totp_enabled"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> ApiResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("Invalid password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AuthConfig, LoggingConfig, RateLimitSettings, ServiceConfig, StorageConfig,
    };

    fn test_config() -> Arc<ServerConfig> {
        Arc::new(ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".into(),
                port: 8080,
                public_url: "http://localhost:8080".into(),
                version: "0.1.0".into(),
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                database: "./data/test.sqlite".into(),
            },
            authentication: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".into(),
                token_ttl: 3600,
                max_failed_attempts: 5,
            },
            email: None,
            rate_limit: RateLimitSettings {
                enabled: false,
                authenticated_rps: 100,
                unauthenticated_rps: 10,
                burst_size: 50,
            },
            logging: LoggingConfig { level: "info".into() },
        })
    }

    async fn test_manager() -> AccountManager {
        let pool = crate::db::test_pool().await;
        AccountManager::new(pool, test_config())
    }

    #[tokio::test]
    async fn register_and_login() {
        let manager = test_manager().await;

        let user = manager
            .register("alice@school.bg", "hunter2hunter2", "Alice", "Petrova", Role::Student)
            .await
            .unwrap();
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.email, "alice@school.bg");

        let (logged_in, session) = manager
            .login("alice@school.bg", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let validated = manager.validate_access_token(&session.token).await.unwrap();
        assert_eq!(validated.user_id, user.id);
        assert_eq!(validated.role, Role::Student);
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let manager = test_manager().await;

        manager
            .register("bob@school.bg", "password123", "Bob", "Ivanov", Role::Student)
            .await
            .unwrap();

        let err = manager
            .register("Bob@School.bg", "password123", "Bob", "Ivanov", Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn lockout_after_failed_attempts() {
        let manager = test_manager().await;

        manager
            .register("carol@school.bg", "correcthorse", "Carol", "Dimitrova", Role::Student)
            .await
            .unwrap();

        for _ in 0..5 {
            let err = manager.login("carol@school.bg", "wrong").await.unwrap_err();
            assert!(matches!(
                err,
                ApiError::Unauthorized(_) | ApiError::AccountLocked(_)
            ));
        }

        // Even the correct password is refused once locked
        let err = manager
            .login("carol@school.bg", "correcthorse")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AccountLocked(_)));
    }

    #[tokio::test]
    async fn password_reset_flow() {
        let manager = test_manager().await;

        manager
            .register("dana@school.bg", "oldpassword", "Dana", "Georgieva", Role::Teacher)
            .await
            .unwrap();

        let token = manager
            .generate_password_reset_token("dana@school.bg")
            .await
            .unwrap();

        manager.reset_password(&token, "newpassword1").await.unwrap();

        assert!(manager.login("dana@school.bg", "oldpassword").await.is_err());
        assert!(manager.login("dana@school.bg", "newpassword1").await.is_ok());

        // Token is single use
        assert!(manager.reset_password(&token, "another").await.is_err());
    }

    #[tokio::test]
    async fn logout_invalidates_session() {
        let manager = test_manager().await;

        manager
            .register("emil@school.bg", "password123", "Emil", "Stoyanov", Role::Admin)
            .await
            .unwrap();
        let (_, session) = manager.login("emil@school.bg", "password123").await.unwrap();

        manager.delete_session(&session.id).await.unwrap();
        assert!(manager.validate_access_token(&session.token).await.is_err());
    }
}
