//! # Pulsebot
//!
//! Slack bot that watches a channel for a fixed window on request and then
//! sends the requester a private per-sender activity report.
//!
//! ## Architecture
//!
//! - **Alerting**: registry of active alerts, per-channel message counters and
//!   the deadline scheduler that triggers reports
//! - **Commands**: `/accept-alerts`, `/cancel-alert`, `/list-alerts`, `/note`,
//!   `/get-notes`
//! - **Slack**: Web API client and request signature checks
//! - **API**: health, alert listing and the Slack callback endpoints
//!
//! ## Quick Start
//!
//! ```bash
//! SLACK_BOT_TOKEN=xoxb-... SLACK_SIGNING_SECRET=... pulsebot serve
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alerting;
pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod notes;
pub mod service;
pub mod slack;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{AlertRegistry, DeadlineScheduler, Directory, MessageDelivery, Report};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::service::Service;
}
