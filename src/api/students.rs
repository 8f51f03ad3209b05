/// Student profile endpoints
use crate::{
    api::middleware::request_meta,
    audit::AuditAction,
    auth::{AuthUser, StaffUser},
    context::AppContext,
    error::ApiResult,
    policy::{self, Action, Resource},
    students::{CreateProfileRequest, StudentProfile, UpdateProfileRequest},
    validation::validate_request,
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};

/// Build student routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/students", post(create_profile).get(list_profiles))
        .route("/students/me", get(my_profile))
        // GET looks up by the owning user id; PUT/DELETE take the profile id
        .route(
            "/students/:id",
            get(get_profile_by_user)
                .put(update_profile)
                .delete(delete_profile),
        )
}

/// Create the authenticated student's profile
async fn create_profile(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    auth: AuthUser,
    Json(req): Json<CreateProfileRequest>,
) -> ApiResult<Json<StudentProfile>> {
    validate_request(&req)?;
    policy::authorize(Resource::Student, Action::Create, &auth.actor(), None)?;

    let profile = ctx.students.create_profile(&auth.user_id, &req).await?;

    ctx.audit
        .log(
            Some(&auth.user_id),
            AuditAction::Create,
            "StudentProfile",
            Some(&profile.id),
            None,
            &request_meta(&headers),
        )
        .await;

    Ok(Json(profile))
}

/// List all profiles (staff only)
async fn list_profiles(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
) -> ApiResult<Json<Vec<StudentProfile>>> {
    let profiles = ctx.students.list_profiles().await?;
    Ok(Json(profiles))
}

/// The authenticated student's own profile
async fn my_profile(State(ctx): State<AppContext>, auth: AuthUser) -> ApiResult<Json<StudentProfile>> {
    let profile = ctx.students.get_by_user(&auth.user_id).await?;
    Ok(Json(profile))
}

/// A profile by its owning user id
async fn get_profile_by_user(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<StudentProfile>> {
    let profile = ctx.students.get_by_user(&user_id).await?;
    policy::authorize(
        Resource::Student,
        Action::Read,
        &auth.actor(),
        Some(&profile.user_id),
    )?;
    Ok(Json(profile))
}

/// Update a profile (owner or admin)
async fn update_profile(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<StudentProfile>> {
    validate_request(&req)?;

    let owner = ctx.students.owner_user_id(&id).await?;
    policy::authorize(Resource::Student, Action::Update, &auth.actor(), Some(&owner))?;

    let profile = ctx.students.update_profile(&id, &req).await?;

    ctx.audit
        .log(
            Some(&auth.user_id),
            AuditAction::Update,
            "StudentProfile",
            Some(&profile.id),
            None,
            &request_meta(&headers),
        )
        .await;

    Ok(Json(profile))
}

/// Delete a profile (admin only via policy)
async fn delete_profile(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let owner = ctx.students.owner_user_id(&id).await?;
    policy::authorize(Resource::Student, Action::Delete, &auth.actor(), Some(&owner))?;

    ctx.students.delete_profile(&id).await?;

    ctx.audit
        .log(
            Some(&auth.user_id),
            AuditAction::Delete,
            "StudentProfile",
            Some(&id),
            None,
            &request_meta(&headers),
        )
        .await;

    Ok(Json(serde_json::json!({})))
}
