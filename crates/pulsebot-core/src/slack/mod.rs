//! Slack platform adapter
//!
//! Web API client for outbound calls plus the wire types and request
//! signing checks used by the inbound HTTP routes.

mod client;
mod events;
mod signature;

pub use client::{SlackClient, SlackError};
pub use events::{EventEnvelope, MessageEvent};
pub use signature::{sign, verify_signature, SignatureError, MAX_REQUEST_AGE_SECS};
