/// Background task implementations
use crate::{context::AppContext, error::ApiResult};

/// Remove sessions past their expiry
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> ApiResult<u64> {
    ctx.accounts.cleanup_expired_sessions().await
}

/// Remove notifications past the retention window
pub async fn cleanup_expired_notifications(ctx: &AppContext) -> ApiResult<u64> {
    ctx.notifications.cleanup_expired().await
}

/// Clear password reset tokens past their expiry
pub async fn cleanup_expired_reset_tokens(ctx: &AppContext) -> ApiResult<u64> {
    ctx.accounts.cleanup_expired_reset_tokens().await
}
