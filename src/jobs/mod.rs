use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::expired_session_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::notification_retention_job(Arc::clone(&self)));
        tokio::spawn(Self::reset_token_cleanup_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Cleanup expired sessions (runs every hour)
    async fn expired_session_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600)); // Every hour

        loop {
            interval.tick().await;
            info!("Running expired session cleanup");

            match tasks::cleanup_expired_sessions(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    } else {
                        info!("Session cleanup: no expired sessions found");
                    }
                }
                Err(e) => error!("Failed to cleanup expired sessions: {}", e),
            }
        }
    }

    /// Enforce the 30-day notification retention window (runs every 6 hours)
    async fn notification_retention_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(21600)); // Every 6 hours

        loop {
            interval.tick().await;
            info!("Running notification retention sweep");

            match tasks::cleanup_expired_notifications(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Removed {} notifications past retention", count);
                    }
                }
                Err(e) => error!("Failed to sweep notifications: {}", e),
            }
        }
    }

    /// Clear stale password reset tokens (runs every 15 minutes)
    async fn reset_token_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(900)); // Every 15 minutes

        loop {
            interval.tick().await;

            match tasks::cleanup_expired_reset_tokens(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleared {} stale reset tokens", count);
                    }
                }
                Err(e) => error!("Failed to clear reset tokens: {}", e),
            }
        }
    }
}
