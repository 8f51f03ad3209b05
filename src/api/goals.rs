/// Goal endpoints
use crate::{
    auth::AuthUser,
    context::AppContext,
    error::ApiResult,
    goals::{category_title, Goal, GoalCategory, UpsertGoalRequest},
    policy::{self, Action, Resource},
    validation::validate_request,
};
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};

/// Build goal routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/goals/categories", get(list_goal_categories))
        .route("/students/:id/goals", get(list_goals))
        .route(
            "/students/:id/goals/:category",
            put(upsert_goal).delete(delete_goal),
        )
}

/// The six fixed categories with their display titles
async fn list_goal_categories(_auth: AuthUser) -> Json<serde_json::Value> {
    let categories: Vec<serde_json::Value> = GoalCategory::all()
        .iter()
        .map(|c| {
            serde_json::json!({
                "category": c.as_str(),
                "title": category_title(*c),
            })
        })
        .collect();
    Json(serde_json::json!({ "categories": categories }))
}

/// List a student's goals
async fn list_goals(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(student_id): Path<String>,
) -> ApiResult<Json<Vec<Goal>>> {
    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(Resource::Goal, Action::Read, &auth.actor(), Some(&owner))?;

    let goals = ctx.goals.list_for_student(&student_id).await?;
    Ok(Json(goals))
}

/// Create or update the goal for one category
async fn upsert_goal(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path((student_id, category)): Path<(String, String)>,
    Json(req): Json<UpsertGoalRequest>,
) -> ApiResult<Json<Goal>> {
    validate_request(&req)?;
    let category = GoalCategory::from_str(&category)?;

    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(Resource::Goal, Action::Update, &auth.actor(), Some(&owner))?;

    let goal = ctx.goals.upsert_goal(&student_id, category, &req).await?;
    Ok(Json(goal))
}

/// Clear the goal for one category
async fn delete_goal(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path((student_id, category)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let category = GoalCategory::from_str(&category)?;

    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(Resource::Goal, Action::Delete, &auth.actor(), Some(&owner))?;

    ctx.goals.delete_goal(&student_id, category).await?;
    Ok(Json(serde_json::json!({})))
}
