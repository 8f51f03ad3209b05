/// Achievement endpoints
use crate::{
    achievements::{Achievement, CreateAchievementRequest},
    auth::AuthUser,
    context::AppContext,
    error::ApiResult,
    policy::{self, Action, Resource},
    validation::validate_request,
};
use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};

/// Build achievement routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/students/:id/achievements",
            get(list_achievements).post(create_achievement),
        )
        .route(
            "/students/:id/achievements/:achievementId",
            delete(delete_achievement),
        )
}

/// List a student's achievements
async fn list_achievements(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(student_id): Path<String>,
) -> ApiResult<Json<Vec<Achievement>>> {
    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(
        Resource::Achievement,
        Action::Read,
        &auth.actor(),
        Some(&owner),
    )?;

    let achievements = ctx.achievements.list_for_student(&student_id).await?;
    Ok(Json(achievements))
}

/// Record an achievement (owner or admin)
async fn create_achievement(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(student_id): Path<String>,
    Json(req): Json<CreateAchievementRequest>,
) -> ApiResult<Json<Achievement>> {
    validate_request(&req)?;

    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(
        Resource::Achievement,
        Action::Create,
        &auth.actor(),
        Some(&owner),
    )?;

    let achievement = ctx.achievements.create(&student_id, &req).await?;
    Ok(Json(achievement))
}

/// Delete an achievement (owner or admin)
async fn delete_achievement(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path((student_id, achievement_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    // Existence first, then subject match, then the role rule
    let owner = ctx.students.owner_user_id(&student_id).await?;
    let achievement = ctx.achievements.get(&achievement_id).await?;
    policy::ensure_subject_match(&student_id, &achievement.student_id)?;
    policy::authorize(
        Resource::Achievement,
        Action::Delete,
        &auth.actor(),
        Some(&owner),
    )?;

    ctx.achievements.delete(&achievement_id).await?;
    Ok(Json(serde_json::json!({})))
}
