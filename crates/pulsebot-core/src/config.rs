//! Configuration management for Pulsebot

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

/// Prefix for layered environment overrides, e.g. `PULSEBOT__ALERTING__WINDOW=12h`
const ENV_PREFIX: &str = "PULSEBOT";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Slack configuration
    #[serde(default)]
    pub slack: SlackConfig,

    /// Alerting configuration
    #[serde(default)]
    pub alerting: AlertingConfig,

    /// Notes configuration
    #[serde(default)]
    pub notes: NotesConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// Later layers win: defaults, then the file, then `PULSEBOT__*`
    /// variables, then the bare `SLACK_BOT_TOKEN`, `SLACK_SIGNING_SECRET`
    /// and `PORT` variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let defaults = ::config::Config::try_from(&Config::default())?;

        let mut builder = ::config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path).required(true));
        }

        let loaded: Config = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .set_override_option("slack.bot_token", env::var("SLACK_BOT_TOKEN").ok())?
            .set_override_option("slack.signing_secret", env::var("SLACK_SIGNING_SECRET").ok())?
            .set_override_option("server.port", env::var("PORT").ok())?
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.alerting.window.is_zero() {
            return Err(Error::config("alerting.window must be greater than zero"));
        }
        if self.notes.max_notes == 0 {
            return Err(Error::config("notes.max_notes must be greater than zero"));
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(Error::config(format!(
                "logging.format must be 'pretty' or 'json', got '{other}'"
            ))),
        }
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// HTTP port (health, Slack events and slash commands)
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Slack configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot User OAuth token (xoxb-...)
    pub bot_token: String,
    /// Signing secret used to verify inbound requests; unset disables verification
    pub signing_secret: Option<String>,
    /// Base URL of the Web API
    pub api_base_url: String,
    /// Timeout for Web API calls in seconds
    pub timeout_seconds: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            signing_secret: None,
            api_base_url: "https://slack.com/api".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// How long an alert tracks its channel before the report is sent
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(300),
        }
    }
}

/// Notes configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    /// A user's notes are cleared once they hold more than this many
    pub max_notes: usize,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self { max_notes: 10 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
