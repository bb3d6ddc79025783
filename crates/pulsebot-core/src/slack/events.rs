//! Events API wire types

use serde::Deserialize;

/// Top-level envelope posted to the events endpoint
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    /// `url_verification` or `event_callback`
    #[serde(rename = "type")]
    pub envelope_type: String,

    /// Present on `url_verification`
    pub challenge: Option<String>,

    /// Present on `event_callback`
    pub event: Option<MessageEvent>,
}

/// Inner event; only message events are acted on
#[derive(Debug, Deserialize)]
pub struct MessageEvent {
    /// Event type, e.g. `message`
    #[serde(rename = "type")]
    pub event_type: String,

    /// Sender; absent for some system messages
    pub user: Option<String>,

    /// Channel the message was posted in
    pub channel: Option<String>,

    /// Set on messages posted by bots, ours included
    pub bot_id: Option<String>,

    /// Set on edits, joins and other non-plain messages
    pub subtype: Option<String>,
}

impl MessageEvent {
    /// `(channel, sender)` if this is a countable human message
    pub fn tracked_message(&self) -> Option<(&str, &str)> {
        if self.event_type != "message" || self.bot_id.is_some() {
            return None;
        }
        // Thread broadcasts are still a human posting in the channel
        if self.subtype.as_deref().is_some_and(|s| s != "thread_broadcast") {
            return None;
        }
        Some((self.channel.as_deref()?, self.user.as_deref()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(json: &str) -> MessageEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_plain_message_is_tracked() {
        let event = parse(r#"{"type": "message", "user": "U1", "channel": "C1", "text": "hi"}"#);
        assert_eq!(event.tracked_message(), Some(("C1", "U1")));
    }

    #[rstest]
    #[case::bot(r#"{"type": "message", "user": "U1", "channel": "C1", "bot_id": "B1"}"#)]
    #[case::edit(r#"{"type": "message", "user": "U1", "channel": "C1", "subtype": "message_changed"}"#)]
    #[case::no_user(r#"{"type": "message", "channel": "C1"}"#)]
    #[case::reaction(r#"{"type": "reaction_added", "user": "U1", "channel": "C1"}"#)]
    fn test_ignored_events(#[case] json: &str) {
        assert_eq!(parse(json).tracked_message(), None);
    }

    #[test]
    fn test_url_verification_envelope() {
        let envelope: EventEnvelope =
            serde_json::from_str(r#"{"type": "url_verification", "challenge": "abc", "token": "t"}"#).unwrap();
        assert_eq!(envelope.envelope_type, "url_verification");
        assert_eq!(envelope.challenge.as_deref(), Some("abc"));
        assert!(envelope.event.is_none());
    }
}
