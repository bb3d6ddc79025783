//! Slack Web API client

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::alerting::{DeliveryError, Directory, MessageDelivery};
use crate::config::SlackConfig;
use crate::error::Result;

/// Thin client over the few Web API methods the bot needs
#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    base_url: String,
    bot_token: String,
}

impl SlackClient {
    /// Create a new Slack client
    pub fn new(config: &SlackConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
        })
    }

    /// `chat.postMessage`; a user id as `channel` opens a direct message
    pub async fn post_message(&self, channel: &str, text: &str) -> std::result::Result<(), SlackError> {
        let request = self
            .client
            .post(self.url("chat.postMessage"))
            .json(&PostMessage { channel, text });

        self.call("chat.postMessage", request).await?;
        Ok(())
    }

    /// `users.info`
    pub async fn user_info(&self, user_id: &str) -> std::result::Result<SlackUser, SlackError> {
        let request = self.client.get(self.url("users.info")).query(&[("user", user_id)]);

        let mut body = self.call("users.info", request).await?;
        Ok(serde_json::from_value(body["user"].take())?)
    }

    /// `conversations.info`
    pub async fn conversation_info(&self, channel_id: &str) -> std::result::Result<SlackChannel, SlackError> {
        let request = self
            .client
            .get(self.url("conversations.info"))
            .query(&[("channel", channel_id)]);

        let mut body = self.call("conversations.info", request).await?;
        Ok(serde_json::from_value(body["channel"].take())?)
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn call(&self, method: &str, request: RequestBuilder) -> std::result::Result<Value, SlackError> {
        let response = request.bearer_auth(&self.bot_token).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SlackError::Status {
                method: method.to_string(),
                status,
            });
        }

        let body: Value = response.json().await?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            return Err(SlackError::Api {
                method: method.to_string(),
                error,
            });
        }

        debug!(method = method, "Slack API call succeeded");
        Ok(body)
    }
}

#[async_trait]
impl MessageDelivery for SlackClient {
    async fn deliver(&self, recipient_id: &str, text: &str) -> std::result::Result<(), DeliveryError> {
        self.post_message(recipient_id, text).await.map_err(|e| {
            if e.is_transient() {
                DeliveryError::Transport(e.to_string())
            } else {
                DeliveryError::Rejected(e.to_string())
            }
        })
    }
}

#[async_trait]
impl Directory for SlackClient {
    async fn display_name(&self, user_id: &str) -> Option<String> {
        match self.user_info(user_id).await {
            Ok(user) => user.preferred_name(),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User lookup failed");
                None
            }
        }
    }

    async fn channel_name(&self, channel_id: &str) -> Option<String> {
        match self.conversation_info(channel_id).await {
            Ok(channel) => channel.name,
            Err(e) => {
                warn!(channel_id = %channel_id, error = %e, "Channel lookup failed");
                None
            }
        }
    }
}

/// Subset of a Slack user object
#[derive(Debug, Clone, Deserialize)]
pub struct SlackUser {
    /// User id
    pub id: String,
    /// Handle
    pub name: Option<String>,
    /// Full name
    pub real_name: Option<String>,
}

impl SlackUser {
    /// Real name when set, otherwise the handle
    pub fn preferred_name(self) -> Option<String> {
        self.real_name
            .filter(|n| !n.trim().is_empty())
            .or(self.name)
            .filter(|n| !n.trim().is_empty())
    }
}

/// Subset of a Slack conversation object
#[derive(Debug, Clone, Deserialize)]
pub struct SlackChannel {
    /// Channel id
    pub id: String,
    /// Channel name without the leading `#`
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

/// Slack client errors
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("{method} returned {status}")]
    Status {
        /// Web API method
        method: String,
        /// HTTP status
        status: StatusCode,
    },

    /// `ok: false` response
    #[error("{method} failed: {error}")]
    Api {
        /// Web API method
        method: String,
        /// Slack error code, e.g. `channel_not_found`
        error: String,
    },

    /// Response shape did not match
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SlackError {
    /// Whether retrying later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::Api { error, .. } => error == "ratelimited",
            Self::Decode(_) => false,
        }
    }
}
