/// Portfolio endpoints
use crate::{
    auth::AuthUser,
    context::AppContext,
    error::ApiResult,
    policy::{self, Action, Resource},
    portfolio::{
        AddRecommendationRequest, Portfolio, Recommendation, UpdatePortfolioRequest,
    },
    validation::validate_request,
};
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};

/// Build portfolio routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/students/:id/portfolio",
            get(get_portfolio).put(update_portfolio),
        )
        .route(
            "/students/:id/portfolio/recommendations",
            post(add_recommendation),
        )
        .route(
            "/students/:id/portfolio/recommendations/:recId",
            delete(remove_recommendation),
        )
}

/// Read a student's portfolio (default shape when unset)
async fn get_portfolio(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(student_id): Path<String>,
) -> ApiResult<Json<Portfolio>> {
    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(
        Resource::Portfolio,
        Action::Read,
        &auth.actor(),
        Some(&owner),
    )?;

    let portfolio = ctx.portfolios.get_or_default(&student_id).await?;
    Ok(Json(portfolio))
}

/// Update a portfolio (owner or admin)
async fn update_portfolio(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(student_id): Path<String>,
    Json(req): Json<UpdatePortfolioRequest>,
) -> ApiResult<Json<Portfolio>> {
    validate_request(&req)?;

    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(
        Resource::Portfolio,
        Action::Update,
        &auth.actor(),
        Some(&owner),
    )?;

    let portfolio = ctx.portfolios.update(&student_id, &req).await?;
    Ok(Json(portfolio))
}

/// Add a recommendation (owner, teacher or admin)
async fn add_recommendation(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(student_id): Path<String>,
    Json(req): Json<AddRecommendationRequest>,
) -> ApiResult<Json<Recommendation>> {
    validate_request(&req)?;

    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(
        Resource::Portfolio,
        Action::Recommend,
        &auth.actor(),
        Some(&owner),
    )?;

    let recommendation = ctx.portfolios.add_recommendation(&student_id, &req).await?;
    Ok(Json(recommendation))
}

/// Remove a recommendation (owner or admin)
async fn remove_recommendation(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path((student_id, rec_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let owner = ctx.students.owner_user_id(&student_id).await?;
    policy::authorize(
        Resource::Portfolio,
        Action::RemoveRecommendation,
        &auth.actor(),
        Some(&owner),
    )?;

    ctx.portfolios
        .remove_recommendation(&student_id, &rec_id)
        .await?;
    Ok(Json(serde_json::json!({})))
}
