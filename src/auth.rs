/// Authentication extractors and utilities
use crate::{
    account::{Role, ValidatedSession},
    api::middleware::extract_bearer_token,
    context::AppContext,
    error::ApiError,
    policy::{is_privileged, Actor},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context - extracts and validates session from request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
    pub session: ValidatedSession,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id.clone(), self.role)
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        // Extract bearer token from Authorization header
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

        // Validate token
        let session = state.accounts.validate_access_token(&token).await?;

        Ok(AuthUser {
            user_id: session.user_id.clone(),
            role: session.role,
            session,
        })
    }
}

/// Staff context - requires teacher or admin role
#[derive(Debug, Clone)]
pub struct StaffUser {
    pub user_id: String,
    pub role: Role,
}

impl StaffUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id.clone(), self.role)
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        if !is_privileged(auth.role, &[Role::Teacher, Role::Admin]) {
            return Err(ApiError::Forbidden(
                "Teacher or admin role required".to_string(),
            ));
        }

        Ok(StaffUser {
            user_id: auth.user_id,
            role: auth.role,
        })
    }
}

/// Admin context - requires admin role
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: String,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        if auth.role != Role::Admin {
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }

        Ok(AdminUser {
            user_id: auth.user_id,
        })
    }
}
