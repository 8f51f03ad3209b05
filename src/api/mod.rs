/// API routes and handlers
pub mod achievements;
pub mod auth;
pub mod credits;
pub mod events;
pub mod goals;
pub mod health;
pub mod interests;
pub mod middleware;
pub mod notifications;
pub mod portfolio;
pub mod reports;
pub mod sanctions;
pub mod students;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(students::routes())
        .merge(credits::routes())
        .merge(goals::routes())
        .merge(interests::routes())
        .merge(achievements::routes())
        .merge(sanctions::routes())
        .merge(events::routes())
        .merge(portfolio::routes())
        .merge(notifications::routes())
        .merge(reports::routes())
}
