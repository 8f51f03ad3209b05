/// Event and participation endpoints
use crate::{
    auth::{AuthUser, StaffUser},
    context::AppContext,
    error::ApiResult,
    events::{
        CreateEventRequest, Event, EventParticipation, FeedbackRequest, UpdateEventRequest,
    },
    policy::{self, Action, Resource},
    validation::validate_request,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

/// Build event routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route(
            "/events/:id/participate",
            post(participate).delete(cancel_participation),
        )
        .route("/events/:id/participations", get(list_participations))
        .route("/participations/:id/confirm", post(confirm_participation))
        .route("/participations/:id/attend", post(mark_attended))
        .route("/participations/:id/feedback", post(submit_feedback))
}

/// List all events (any authenticated user)
async fn list_events(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
) -> ApiResult<Json<Vec<Event>>> {
    let events = ctx.events.list_events().await?;
    Ok(Json(events))
}

/// Get one event
async fn get_event(
    State(ctx): State<AppContext>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Event>> {
    let event = ctx.events.get_event(&id).await?;
    Ok(Json(event))
}

/// Create an event (teacher/admin)
async fn create_event(
    State(ctx): State<AppContext>,
    staff: StaffUser,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<Json<Event>> {
    validate_request(&req)?;
    policy::authorize(Resource::Event, Action::Create, &staff.actor(), None)?;

    let event = ctx.events.create_event(&staff.user_id, &req).await?;
    Ok(Json(event))
}

/// Update an event (creator or admin)
async fn update_event(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> ApiResult<Json<Event>> {
    validate_request(&req)?;

    let event = ctx.events.get_event(&id).await?;
    policy::authorize(
        Resource::Event,
        Action::Update,
        &auth.actor(),
        Some(&event.created_by),
    )?;

    let event = ctx.events.update_event(&id, &req).await?;
    Ok(Json(event))
}

/// Delete an event (creator or admin); cascades participations and
/// notifies active participants
async fn delete_event(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let event = ctx.events.get_event(&id).await?;
    policy::authorize(
        Resource::Event,
        Action::Delete,
        &auth.actor(),
        Some(&event.created_by),
    )?;

    ctx.events.delete_event(&id).await?;
    Ok(Json(serde_json::json!({})))
}

/// Register the authenticated student for an event
async fn participate(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(event_id): Path<String>,
) -> ApiResult<Json<EventParticipation>> {
    policy::authorize(Resource::Event, Action::Participate, &auth.actor(), None)?;

    let profile = ctx.students.get_by_user(&auth.user_id).await?;
    let participation = ctx.events.participate(&event_id, &profile.id).await?;
    Ok(Json(participation))
}

/// Cancel the authenticated student's registration
async fn cancel_participation(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(event_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    policy::authorize(Resource::Event, Action::Participate, &auth.actor(), None)?;

    let profile = ctx.students.get_by_user(&auth.user_id).await?;
    ctx.events.cancel_participation(&event_id, &profile.id).await?;
    Ok(Json(serde_json::json!({})))
}

/// List an event's participations (staff view)
async fn list_participations(
    State(ctx): State<AppContext>,
    _staff: StaffUser,
    Path(event_id): Path<String>,
) -> ApiResult<Json<Vec<EventParticipation>>> {
    // Surface NotFound for a missing event before listing
    ctx.events.get_event(&event_id).await?;
    let participations = ctx.events.list_participations(&event_id).await?;
    Ok(Json(participations))
}

/// Confirm own participation (registered -> confirmed)
async fn confirm_participation(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<EventParticipation>> {
    let participation = ctx.events.get_participation(&id).await?;
    let owner = ctx.students.owner_user_id(&participation.student_id).await?;
    policy::authorize(
        Resource::Participation,
        Action::Confirm,
        &auth.actor(),
        Some(&owner),
    )?;

    let participation = ctx.events.confirm_participation(&id).await?;
    Ok(Json(participation))
}

/// Mark attendance (teacher/admin; confirmed -> attended)
async fn mark_attended(
    State(ctx): State<AppContext>,
    staff: StaffUser,
    Path(id): Path<String>,
) -> ApiResult<Json<EventParticipation>> {
    let participation = ctx.events.get_participation(&id).await?;
    let owner = ctx.students.owner_user_id(&participation.student_id).await?;
    policy::authorize(
        Resource::Participation,
        Action::Attend,
        &staff.actor(),
        Some(&owner),
    )?;

    let participation = ctx.events.mark_attended(&id).await?;
    Ok(Json(participation))
}

/// Leave feedback on own participation
async fn submit_feedback(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<FeedbackRequest>,
) -> ApiResult<Json<EventParticipation>> {
    validate_request(&req)?;

    let participation = ctx.events.get_participation(&id).await?;
    let owner = ctx.students.owner_user_id(&participation.student_id).await?;
    policy::authorize(
        Resource::Participation,
        Action::Update,
        &auth.actor(),
        Some(&owner),
    )?;

    let participation = ctx.events.submit_feedback(&id, &req.feedback).await?;
    Ok(Json(participation))
}
