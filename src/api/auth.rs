/// Identity endpoints: register, login, logout, me, password reset
use crate::{
    account::{
        LoginRequest, PasswordResetConfirm, PasswordResetRequest, RegisterRequest, Role,
        SessionResponse,
    },
    api::middleware::request_meta,
    audit::AuditAction,
    auth::AuthUser,
    context::AppContext,
    error::ApiResult,
    validation::validate_request,
};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/password-reset/request", post(request_password_reset))
        .route("/auth/password-reset/confirm", post(confirm_password_reset))
}

/// Register endpoint. Self-registration is student-only; staff accounts are
/// provisioned out of band.
async fn register(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<SessionResponse>> {
    validate_request(&req)?;

    let role = req.role.unwrap_or(Role::Student);
    if role != Role::Student {
        return Err(crate::error::ApiError::Forbidden(
            "Only student accounts can self-register".to_string(),
        ));
    }

    let user = ctx
        .accounts
        .register(&req.email, &req.password, &req.first_name, &req.last_name, role)
        .await?;

    let session = ctx.accounts.create_session(&user.id).await?;

    ctx.audit
        .log(
            Some(&user.id),
            AuditAction::Register,
            "User",
            Some(&user.id),
            None,
            &request_meta(&headers),
        )
        .await;

    Ok(Json(SessionResponse {
        user_id: user.id,
        email: user.email,
        role: user.role,
        access_token: session.token,
        expires_at: session.expires_at,
    }))
}

/// Login endpoint
async fn login(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let (user, session) = ctx.accounts.login(&req.email, &req.password).await?;

    ctx.audit
        .log(
            Some(&user.id),
            AuditAction::Login,
            "User",
            Some(&user.id),
            None,
            &request_meta(&headers),
        )
        .await;

    Ok(Json(SessionResponse {
        user_id: user.id,
        email: user.email,
        role: user.role,
        access_token: session.token,
        expires_at: session.expires_at,
    }))
}

/// Logout endpoint
async fn logout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    auth: AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.accounts.delete_session(&auth.session.session_id).await?;

    ctx.audit
        .log(
            Some(&auth.user_id),
            AuditAction::Logout,
            "User",
            Some(&auth.user_id),
            None,
            &request_meta(&headers),
        )
        .await;

    Ok(Json(serde_json::json!({})))
}

/// Current user info
async fn me(State(ctx): State<AppContext>, auth: AuthUser) -> ApiResult<Json<serde_json::Value>> {
    let user = ctx.accounts.get_user(&auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "id": user.id,
        "email": user.email,
        "firstName": user.first_name,
        "lastName": user.last_name,
        "role": user.role,
    })))
}

/// Request a password reset token (public endpoint).
/// Always returns success so account existence cannot be probed.
async fn request_password_reset(
    State(ctx): State<AppContext>,
    Json(req): Json<PasswordResetRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    match ctx.accounts.generate_password_reset_token(&req.email).await {
        Ok(token) => {
            if ctx.mailer.is_configured() {
                let user = ctx.accounts.get_user_by_email(&req.email).await?;
                let base_url = ctx.service_url();
                if let Err(e) = ctx
                    .mailer
                    .send_password_reset_email(&user.email, &user.first_name, &token, &base_url)
                    .await
                {
                    tracing::warn!("Failed to send password reset email: {}", e);
                }
            } else {
                tracing::warn!("Email not configured, reset token generated but not sent");
            }
        }
        Err(e) => {
            tracing::debug!("Password reset requested for unknown account: {}", e);
        }
    }

    Ok(Json(serde_json::json!({})))
}

/// Confirm a password reset
async fn confirm_password_reset(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<PasswordResetConfirm>,
) -> ApiResult<Json<serde_json::Value>> {
    validate_request(&req)?;

    ctx.accounts.reset_password(&req.token, &req.new_password).await?;

    ctx.audit
        .log(
            None,
            AuditAction::PasswordReset,
            "User",
            None,
            None,
            &request_meta(&headers),
        )
        .await;

    Ok(Json(serde_json::json!({})))
}
