//! Slash command data models

use serde::{Deserialize, Serialize};

/// Slash command payload as posted by Slack (form encoded)
#[derive(Debug, Clone, Deserialize)]
pub struct SlashCommand {
    /// Command name including the leading slash, e.g. `/accept-alerts`
    pub command: String,

    /// Invoking user
    pub user_id: String,

    /// Channel the command was issued in
    pub channel_id: String,

    /// Text following the command
    #[serde(default)]
    pub text: String,
}

/// Who sees a command response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseVisibility {
    /// Only the invoking user
    #[default]
    Ephemeral,
    /// Everyone in the channel
    InChannel,
}

/// Response returned to the slash command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Visibility of the response
    #[serde(rename = "response_type")]
    pub visibility: ResponseVisibility,

    /// Response text
    pub text: String,
}

impl CommandResponse {
    /// Response only the invoking user sees
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            visibility: ResponseVisibility::Ephemeral,
            text: text.into(),
        }
    }

    /// Response posted to the channel
    pub fn in_channel(text: impl Into<String>) -> Self {
        Self {
            visibility: ResponseVisibility::InChannel,
            text: text.into(),
        }
    }
}
