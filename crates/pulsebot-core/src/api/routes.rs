//! API routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))

        // Alerts
        .route("/api/v1/alerts", get(handlers::list_alerts))

        // Slack callbacks
        .route("/slack/events", post(handlers::slack_events))
        .route("/slack/commands", post(handlers::slack_commands))

        .with_state(state)
}
