/// Report and statistics endpoints (teacher/admin only)
use crate::{
    auth::StaffUser,
    context::AppContext,
    error::ApiResult,
    policy::{self, Action, Resource},
    reports::ExportFormat,
};
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

/// Build report routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/reports/absences", get(absence_report))
        .route("/reports/events", get(event_report))
        .route("/reports/credits", get(credit_report))
        .route("/reports/user/:id/:format", get(export_student_report))
}

/// Absence rollup per student
async fn absence_report(
    State(ctx): State<AppContext>,
    staff: StaffUser,
) -> ApiResult<Json<serde_json::Value>> {
    policy::authorize(Resource::Report, Action::Read, &staff.actor(), None)?;

    let rows = ctx.stats.absence_report().await?;
    let critical = rows.iter().filter(|r| r.critical).count();

    Ok(Json(serde_json::json!({
        "students": rows,
        "criticalCount": critical,
    })))
}

/// Event participation rollup
async fn event_report(
    State(ctx): State<AppContext>,
    staff: StaffUser,
) -> ApiResult<Json<serde_json::Value>> {
    policy::authorize(Resource::Report, Action::Read, &staff.actor(), None)?;

    let stats = ctx.stats.event_stats().await?;
    Ok(Json(serde_json::json!(stats)))
}

/// Credit rollup plus rankings
async fn credit_report(
    State(ctx): State<AppContext>,
    staff: StaffUser,
) -> ApiResult<Json<serde_json::Value>> {
    policy::authorize(Resource::Report, Action::Read, &staff.actor(), None)?;

    let credits = ctx.stats.credit_stats().await?;
    let top_achievers = ctx.stats.top_achievers().await?;
    let top_hobbies = ctx.stats.top_hobbies().await?;
    let grades = ctx.stats.grade_breakdown().await?;

    Ok(Json(serde_json::json!({
        "credits": credits,
        "topAchievers": top_achievers,
        "topHobbies": top_hobbies,
        "gradeBreakdown": grades,
    })))
}

/// Export one student's full report as a binary attachment
async fn export_student_report(
    State(ctx): State<AppContext>,
    staff: StaffUser,
    Path((student_id, format)): Path<(String, String)>,
) -> ApiResult<Response> {
    policy::authorize(Resource::Report, Action::Read, &staff.actor(), None)?;

    let format = ExportFormat::from_str(&format)?;
    let document = ctx.stats.student_report(&student_id).await?;
    let bytes = document.render(format)?;
    let filename = document.filename(format);

    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}
