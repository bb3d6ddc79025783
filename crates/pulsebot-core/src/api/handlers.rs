//! API handlers for health, alert listing and the Slack callbacks

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::alerting::AlertRegistry;
use crate::commands::CommandHandler;
use crate::models::{Alert, SlashCommand};
use crate::slack::{verify_signature, EventEnvelope};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AlertRegistry>,
    pub commands: Arc<CommandHandler>,
    /// Unset disables request verification
    pub signing_secret: Option<Arc<str>>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_alerts: usize,
    pub pending_deadlines: usize,
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_alerts: state.registry.active_count(),
        pending_deadlines: state.registry.pending_deadlines(),
    })
}

/// List active alerts
pub async fn list_alerts(State(state): State<AppState>) -> Json<Vec<Alert>> {
    let mut alerts = state.registry.list_active();
    alerts.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
    Json(alerts)
}

/// Events API callback: answers URL verification and counts channel messages
pub async fn slack_events(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(rejection) = verify(&state, &headers, &body) {
        return rejection;
    }

    let envelope: EventEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Failed to parse event envelope");
            return (StatusCode::BAD_REQUEST, "bad_json").into_response();
        }
    };

    match envelope.envelope_type.as_str() {
        "url_verification" => envelope.challenge.unwrap_or_default().into_response(),
        "event_callback" => {
            if let Some((channel_id, sender_id)) = envelope.event.as_ref().and_then(|e| e.tracked_message()) {
                state.registry.record_message(channel_id, sender_id);
            }
            StatusCode::OK.into_response()
        }
        other => {
            debug!(envelope_type = %other, "Ignoring envelope");
            StatusCode::OK.into_response()
        }
    }
}

/// Slash command callback
pub async fn slack_commands(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(rejection) = verify(&state, &headers, &body) {
        return rejection;
    }

    let invocation: SlashCommand = match serde_urlencoded::from_bytes(&body) {
        Ok(invocation) => invocation,
        Err(e) => {
            warn!(error = %e, "Failed to parse slash command");
            return (StatusCode::BAD_REQUEST, "bad_form").into_response();
        }
    };

    debug!(command = %invocation.command, user_id = %invocation.user_id, "Slash command received");
    Json(state.commands.handle(&invocation).await).into_response()
}

fn verify(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), Response> {
    let Some(secret) = state.signing_secret.as_deref() else {
        return Ok(());
    };

    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    verify_signature(
        secret,
        header("x-slack-request-timestamp"),
        header("x-slack-signature"),
        body,
        chrono::Utc::now().timestamp(),
    )
    .map_err(|e| {
        warn!(error = %e, "Rejecting unsigned or mis-signed request");
        (StatusCode::UNAUTHORIZED, "invalid_signature").into_response()
    })
}
