/// Shared fixtures for manager tests
use crate::students::{CreateProfileRequest, StudentManager};
use chrono::Utc;
use sqlx::SqlitePool;

/// Insert a student user plus profile, returning the profile id
pub(crate) async fn seed_student(db: &SqlitePool, user_id: &str) -> String {
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, role, created_at)
         VALUES (?1, ?2, 'x', 'Test', 'Student', 'student', ?3)",
    )
    .bind(user_id)
    .bind(format!("{}@school.bg", user_id))
    .bind(Utc::now().to_rfc3339())
    .execute(db)
    .await
    .unwrap();

    let manager = StudentManager::new(db.clone());
    let profile = manager
        .create_profile(
            user_id,
            &CreateProfileRequest {
                grade: 10,
                specialization: Some("Mathematics".into()),
                average_grade: Some(5.5),
                image_url: None,
            },
        )
        .await
        .unwrap();
    profile.id
}

/// Insert a staff user (teacher/admin)
pub(crate) async fn seed_staff(db: &SqlitePool, user_id: &str, role: &str) {
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, role, created_at)
         VALUES (?1, ?2, 'x', 'Test', 'Staff', ?3, ?4)",
    )
    .bind(user_id)
    .bind(format!("{}@school.bg", user_id))
    .bind(role)
    .bind(Utc::now().to_rfc3339())
    .execute(db)
    .await
    .unwrap();
}
