/// Credit endpoints
use crate::{
    auth::{AuthUser, StaffUser},
    context::AppContext,
    credits::{
        CreateCreditRequest, Credit, CreditCategory, CreditStatus, Pillar, UpdateCreditRequest,
        ValidateCreditRequest,
    },
    error::ApiResult,
    policy::{self, Action, Resource},
    validation::validate_request,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

/// Build credit routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/credits", post(create_credit).get(list_credits))
        .route("/credits/categories", get(list_categories).post(create_category))
        .route(
            "/credits/:id",
            get(get_credit).patch(update_credit).delete(delete_credit),
        )
        .route("/credits/:id/validate", patch(validate_credit))
        .route("/students/:id/credits", get(list_student_credits))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
}

/// Submit a credit. Students submit for themselves only.
async fn create_credit(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Json(req): Json<CreateCreditRequest>,
) -> ApiResult<Json<Credit>> {
    validate_request(&req)?;

    // The authenticated student, for themself only: the target profile is
    // resolved from the requester's own account.
    let profile = ctx.students.get_by_user(&auth.user_id).await?;
    policy::authorize(
        Resource::Credit,
        Action::Create,
        &auth.actor(),
        Some(&profile.user_id),
    )?;

    let credit = ctx.credits.create_credit(&profile.id, &req).await?;
    Ok(Json(credit))
}

/// List all credits (staff view)
async fn list_credits(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Credit>>> {
    let status = query
        .status
        .as_deref()
        .map(CreditStatus::from_str)
        .transpose()?;
    let credits = ctx.credits.list_all(status).await?;
    Ok(Json(credits))
}

/// List one student's credits
async fn list_student_credits(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(student_id): Path<String>,
) -> ApiResult<Json<Vec<Credit>>> {
    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(Resource::Credit, Action::Read, &auth.actor(), Some(&owner))?;

    let credits = ctx.credits.list_for_student(&student_id).await?;
    Ok(Json(credits))
}

/// Get one credit
async fn get_credit(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Credit>> {
    let credit = ctx.credits.get_credit(&id).await?;
    let owner = ctx.students.owner_user_id(&credit.student_id).await?;
    policy::authorize(Resource::Credit, Action::Read, &auth.actor(), Some(&owner))?;
    Ok(Json(credit))
}

/// Edit a pending credit (owner) or any credit (admin)
async fn update_credit(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateCreditRequest>,
) -> ApiResult<Json<Credit>> {
    validate_request(&req)?;

    let credit = ctx.credits.get_credit(&id).await?;
    let owner = ctx.students.owner_user_id(&credit.student_id).await?;
    policy::authorize(Resource::Credit, Action::Update, &auth.actor(), Some(&owner))?;

    let credit = ctx.credits.update_credit(&id, &req, auth.role).await?;
    Ok(Json(credit))
}

/// Decide a pending credit (teacher/admin)
async fn validate_credit(
    State(ctx): State<AppContext>,
    staff: StaffUser,
    Path(id): Path<String>,
    Json(req): Json<ValidateCreditRequest>,
) -> ApiResult<Json<Credit>> {
    let credit = ctx.credits.get_credit(&id).await?;
    let owner = ctx.students.owner_user_id(&credit.student_id).await?;
    policy::authorize(
        Resource::Credit,
        Action::Validate,
        &staff.actor(),
        Some(&owner),
    )?;

    let credit = ctx
        .credits
        .decide_credit(&id, req.status, &staff.user_id, staff.role, &owner)
        .await?;
    Ok(Json(credit))
}

/// Delete a credit
async fn delete_credit(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let credit = ctx.credits.get_credit(&id).await?;
    let owner = ctx.students.owner_user_id(&credit.student_id).await?;
    policy::authorize(Resource::Credit, Action::Delete, &auth.actor(), Some(&owner))?;

    ctx.credits.delete_credit(&id, auth.role).await?;
    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCategoryRequest {
    pillar: Pillar,
    name: String,
    description: Option<String>,
}

/// List credit categories (any authenticated user)
async fn list_categories(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Json<Vec<CreditCategory>>> {
    let pillar = query.pillar.as_deref().map(Pillar::from_str).transpose()?;
    let categories = ctx.credits.list_categories(pillar).await?;
    Ok(Json(categories))
}

#[derive(Debug, Deserialize)]
struct CategoryQuery {
    pillar: Option<String>,
}

/// Create a credit category (admin reference data)
async fn create_category(
    State(ctx): State<AppContext>,
    _admin: crate::auth::AdminUser,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<Json<CreditCategory>> {
    let category = ctx
        .credits
        .create_category(req.pillar, &req.name, req.description.as_deref())
        .await?;
    Ok(Json(category))
}
