//! Capabilities the alert engine borrows from the chat platform

use async_trait::async_trait;
use tracing::debug;

/// Delivers text to a user, typically as a direct message
#[async_trait]
pub trait MessageDelivery: Send + Sync {
    /// Send `text` to `recipient_id`
    async fn deliver(&self, recipient_id: &str, text: &str) -> Result<(), DeliveryError>;
}

/// Best-effort name lookups; `None` means the lookup failed or found nothing
#[async_trait]
pub trait Directory: Send + Sync {
    /// Human readable name of a user
    async fn display_name(&self, user_id: &str) -> Option<String>;

    /// Human readable name of a channel
    async fn channel_name(&self, channel_id: &str) -> Option<String>;
}

/// Resolve a user's display name, falling back to the raw id
pub async fn resolve_display_name(directory: &dyn Directory, user_id: &str) -> String {
    match directory.display_name(user_id).await {
        Some(name) if !name.trim().is_empty() => name,
        _ => {
            debug!(user_id = %user_id, "Display name unavailable, using raw id");
            user_id.to_string()
        }
    }
}

/// Resolve a channel's name, falling back to the raw id
pub async fn resolve_channel_name(directory: &dyn Directory, channel_id: &str) -> String {
    match directory.channel_name(channel_id).await {
        Some(name) if !name.trim().is_empty() => name,
        _ => {
            debug!(channel_id = %channel_id, "Channel name unavailable, using raw id");
            channel_id.to_string()
        }
    }
}

/// Delivery errors
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The request never reached the platform
    #[error("Transport error: {0}")]
    Transport(String),

    /// The platform refused the message
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}


#[cfg(test)]
mod tests {
    use super::testing::StaticDirectory;
    use super::*;

    #[tokio::test]
    async fn test_resolution_falls_back_to_raw_ids() {
        let directory = StaticDirectory::default()
            .with_user("U1", "Alice")
            .with_user("U2", "  ")
            .with_channel("C1", "general");

        assert_eq!(resolve_display_name(&directory, "U1").await, "Alice");
        assert_eq!(resolve_display_name(&directory, "U2").await, "U2");
        assert_eq!(resolve_display_name(&directory, "U3").await, "U3");
        assert_eq!(resolve_channel_name(&directory, "C1").await, "general");
        assert_eq!(resolve_channel_name(&directory, "C9").await, "C9");
    }
}
