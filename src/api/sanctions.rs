/// Sanction endpoints
///
/// Absence counters and the active list are staff-written; the owning
/// student may only read.
use crate::{
    auth::{AuthUser, StaffUser},
    context::AppContext,
    error::ApiResult,
    policy::{self, Action, Resource},
    sanctions::{
        ActiveSanction, AddSanctionRequest, SanctionRecord, UpdateAbsencesRequest,
        UpdateRemarksRequest,
    },
    validation::validate_request,
};
use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};

/// Build sanction routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/students/:id/sanctions", get(get_sanctions))
        .route("/students/:id/sanctions/absences", put(update_absences))
        .route("/students/:id/sanctions/schoolo-remarks", put(update_remarks))
        .route("/students/:id/sanctions/active", post(add_sanction))
        .route(
            "/students/:id/sanctions/active/:sanctionId",
            delete(remove_sanction),
        )
}

/// Read a student's sanction record (default shape when unset)
async fn get_sanctions(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(student_id): Path<String>,
) -> ApiResult<Json<SanctionRecord>> {
    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(Resource::Sanction, Action::Read, &auth.actor(), Some(&owner))?;

    let record = ctx.sanctions.get_or_default(&student_id).await?;
    Ok(Json(record))
}

/// Replace the absence counters (staff only)
async fn update_absences(
    State(ctx): State<AppContext>,
    staff: StaffUser,
    Path(student_id): Path<String>,
    Json(req): Json<UpdateAbsencesRequest>,
) -> ApiResult<Json<SanctionRecord>> {
    validate_request(&req)?;

    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(
        Resource::Sanction,
        Action::Update,
        &staff.actor(),
        Some(&owner),
    )?;

    let record = ctx
        .sanctions
        .update_absences(&student_id, &owner, &req)
        .await?;
    Ok(Json(record))
}

/// Replace the school remark counter (staff only)
async fn update_remarks(
    State(ctx): State<AppContext>,
    staff: StaffUser,
    Path(student_id): Path<String>,
    Json(req): Json<UpdateRemarksRequest>,
) -> ApiResult<Json<SanctionRecord>> {
    validate_request(&req)?;

    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(
        Resource::Sanction,
        Action::Update,
        &staff.actor(),
        Some(&owner),
    )?;

    let record = ctx
        .sanctions
        .update_remarks(&student_id, &owner, &req)
        .await?;
    Ok(Json(record))
}

/// Issue an active sanction (staff only)
async fn add_sanction(
    State(ctx): State<AppContext>,
    staff: StaffUser,
    Path(student_id): Path<String>,
    Json(req): Json<AddSanctionRequest>,
) -> ApiResult<Json<ActiveSanction>> {
    validate_request(&req)?;

    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(
        Resource::Sanction,
        Action::Update,
        &staff.actor(),
        Some(&owner),
    )?;

    let sanction = ctx
        .sanctions
        .add_sanction(&student_id, &owner, &staff.user_id, &req)
        .await?;
    Ok(Json(sanction))
}

/// Remove one active sanction by id (staff only)
async fn remove_sanction(
    State(ctx): State<AppContext>,
    staff: StaffUser,
    Path((student_id, sanction_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(
        Resource::Sanction,
        Action::Update,
        &staff.actor(),
        Some(&owner),
    )?;

    ctx.sanctions
        .remove_sanction(&student_id, &owner, &sanction_id)
        .await?;
    Ok(Json(serde_json::json!({})))
}
