/// StudentHub - school record-keeping platform
///
/// Stores student profiles, credits, goals, interests, achievements,
/// sanctions, events, notifications and portfolios behind a role-checked
/// REST API.
mod account;
mod achievements;
mod api;
mod audit;
mod auth;
mod config;
mod context;
mod credits;
mod db;
mod error;
mod events;
mod goals;
mod interests;
mod jobs;
mod mailer;
mod metrics;
mod notifications;
mod policy;
mod portfolio;
mod rate_limit;
mod reports;
mod sanctions;
#[cfg(test)]
mod scenarios;
mod server;
mod students;
#[cfg(test)]
mod test_support;
mod validation;

use config::ServerConfig;
use context::AppContext;
use error::ApiResult;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ApiResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studenthub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;
    let ctx = Arc::new(ctx);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}
