/// Notification endpoints. Everything is scoped to the requesting user.
use crate::{
    auth::AuthUser, context::AppContext, error::ApiResult, notifications::Notification,
};
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, patch},
    Json, Router,
};
use serde::Deserialize;

/// Build notification routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/read-all", patch(mark_all_read))
        .route("/notifications/:id/read", patch(mark_read))
        .route("/notifications/:id", delete(delete_notification))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    unread_only: Option<bool>,
    limit: Option<i64>,
}

/// List the requesting user's notifications
async fn list_notifications(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let notifications: Vec<Notification> = ctx
        .notifications
        .list_for_user(&auth.user_id, query.unread_only.unwrap_or(false), limit)
        .await?;
    let unread = ctx.notifications.unread_count(&auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "notifications": notifications,
        "unreadCount": unread,
    })))
}

/// Mark one notification read
async fn mark_read(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.notifications.mark_read(&auth.user_id, &id).await?;
    Ok(Json(serde_json::json!({})))
}

/// Mark all of the requesting user's notifications read
async fn mark_all_read(
    State(ctx): State<AppContext>,
    auth: AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let updated = ctx.notifications.mark_all_read(&auth.user_id).await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

/// Delete one notification
async fn delete_notification(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.notifications.delete(&auth.user_id, &id).await?;
    Ok(Json(serde_json::json!({})))
}
