/// Interest endpoints
use crate::{
    auth::AuthUser,
    context::AppContext,
    error::ApiResult,
    interests::{Interests, UpdateInterestsRequest},
    policy::{self, Action, Resource},
};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

/// Build interest routes
pub fn routes() -> Router<AppContext> {
    Router::new().route(
        "/students/:id/interests",
        get(get_interests).put(update_interests),
    )
}

/// Read a student's interests (default shape when unset)
async fn get_interests(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(student_id): Path<String>,
) -> ApiResult<Json<Interests>> {
    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(Resource::Interest, Action::Read, &auth.actor(), Some(&owner))?;

    let interests = ctx.interests.get_or_default(&student_id).await?;
    Ok(Json(interests))
}

/// Replace a student's interests
async fn update_interests(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(student_id): Path<String>,
    Json(req): Json<UpdateInterestsRequest>,
) -> ApiResult<Json<Interests>> {
    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(
        Resource::Interest,
        Action::Update,
        &auth.actor(),
        Some(&owner),
    )?;

    let interests = ctx.interests.update(&student_id, &req).await?;
    Ok(Json(interests))
}
