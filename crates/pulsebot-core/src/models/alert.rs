//! Alert data models

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Everything needed to start tracking a channel for a requester
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRequest {
    /// User who asked for tracking; receives the report
    pub requester_id: String,

    /// Display name of the requester (falls back to the raw id)
    pub requester_name: String,

    /// Channel being watched
    pub channel_id: String,

    /// Display name of the channel (falls back to the raw id)
    pub channel_name: String,

    /// Free text supplied with the command
    pub note: Option<String>,
}

impl AlertRequest {
    /// Request whose display names are the raw identifiers
    pub fn new(requester_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        let requester_id = requester_id.into();
        let channel_id = channel_id.into();
        Self {
            requester_name: requester_id.clone(),
            channel_name: channel_id.clone(),
            requester_id,
            channel_id,
            note: None,
        }
    }

    /// Set the requester display name
    #[must_use]
    pub fn with_requester_name(mut self, name: impl Into<String>) -> Self {
        self.requester_name = name.into();
        self
    }

    /// Set the channel display name
    #[must_use]
    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = name.into();
        self
    }

    /// Attach a note
    #[must_use]
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note.filter(|n| !n.trim().is_empty());
        self
    }
}

/// An active activity alert
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    /// Generation id; a superseding alert for the same requester gets a new one
    pub id: Uuid,

    /// User who receives the report
    pub requester_id: String,

    /// Requester display name
    pub requester_name: String,

    /// Channel being watched
    pub channel_id: String,

    /// Channel display name
    pub channel_name: String,

    /// Note supplied with the request
    pub note: Option<String>,

    /// When tracking started
    pub started_at: DateTime<Utc>,

    /// When the report is due
    pub expires_at: DateTime<Utc>,

    /// Tracking window
    #[serde(with = "humantime_serde")]
    pub window: Duration,

    /// Monotonic deadline the scheduler fires at
    #[serde(skip)]
    pub deadline: Instant,
}

impl Alert {
    /// Build a fresh alert starting now
    pub fn start(request: AlertRequest, window: Duration) -> Self {
        let started_at = Utc::now();
        let expires_at = chrono::Duration::from_std(window)
            .ok()
            .and_then(|w| started_at.checked_add_signed(w))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            id: Uuid::new_v4(),
            requester_id: request.requester_id,
            requester_name: request.requester_name,
            channel_id: request.channel_id,
            channel_name: request.channel_name,
            note: request.note,
            started_at,
            expires_at,
            window,
            deadline: Instant::now() + window,
        }
    }

    /// Time left until the report is due
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Handle returned to the caller of `create`
    pub fn handle(&self) -> AlertHandle {
        AlertHandle {
            alert_id: self.id,
            requester_id: self.requester_id.clone(),
            channel_id: self.channel_id.clone(),
            started_at: self.started_at,
            expires_at: self.expires_at,
            window: self.window,
        }
    }
}

/// Identifies one created alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertHandle {
    /// Generation id of the alert
    pub alert_id: Uuid,
    /// Requester the alert belongs to
    pub requester_id: String,
    /// Channel the alert watches
    pub channel_id: String,
    /// When tracking started
    pub started_at: DateTime<Utc>,
    /// When the report is due
    pub expires_at: DateTime<Utc>,
    /// Tracking window
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}
