//! Slash command handling

use std::sync::Arc;
use tracing::{info, warn};

use crate::alerting::{resolve_channel_name, resolve_display_name, AlertRegistry, Directory, MessageDelivery};
use crate::models::{AlertRequest, CommandResponse, SlashCommand};
use crate::notes::NotesStore;

/// Commands the bot understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start tracking the current channel
    AcceptAlert {
        /// Optional note echoed in the report
        note: Option<String>,
    },
    /// Stop tracking early, without a report
    CancelAlert,
    /// Show the caller's active alerts
    ListAlerts,
    /// Save a note
    AddNote {
        /// Note text
        text: String,
    },
    /// DM the caller their notes
    GetNotes,
    /// Anything else
    Unknown(String),
}

impl Command {
    /// Map a slash command name and its text onto a command
    pub fn parse(name: &str, text: &str) -> Self {
        let text = text.trim();
        match name {
            "/accept-alerts" | "/accept-alert" => Self::AcceptAlert {
                note: (!text.is_empty()).then(|| text.to_string()),
            },
            "/cancel-alert" => Self::CancelAlert,
            "/list-alerts" => Self::ListAlerts,
            "/note" => Self::AddNote {
                text: text.to_string(),
            },
            "/get-notes" => Self::GetNotes,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Turns slash commands into registry and notes operations
pub struct CommandHandler {
    registry: Arc<AlertRegistry>,
    notes: Arc<NotesStore>,
    directory: Arc<dyn Directory>,
    delivery: Arc<dyn MessageDelivery>,
}

impl CommandHandler {
    /// Create a new command handler
    pub fn new(
        registry: Arc<AlertRegistry>,
        notes: Arc<NotesStore>,
        directory: Arc<dyn Directory>,
        delivery: Arc<dyn MessageDelivery>,
    ) -> Self {
        Self {
            registry,
            notes,
            directory,
            delivery,
        }
    }

    /// Handle one slash command invocation
    pub async fn handle(&self, invocation: &SlashCommand) -> CommandResponse {
        let command = Command::parse(&invocation.command, &invocation.text);
        let user_id = invocation.user_id.as_str();

        match command {
            Command::AcceptAlert { note } => self.accept_alert(user_id, &invocation.channel_id, note).await,
            Command::CancelAlert => self.cancel_alert(user_id).await,
            Command::ListAlerts => self.list_alerts(user_id),
            Command::AddNote { text } => self.add_note(user_id, text).await,
            Command::GetNotes => self.get_notes(user_id).await,
            Command::Unknown(name) => {
                warn!(command = %name, user_id = %user_id, "Unknown slash command");
                CommandResponse::ephemeral(format!("Unknown command: {name}"))
            }
        }
    }

    async fn accept_alert(&self, user_id: &str, channel_id: &str, note: Option<String>) -> CommandResponse {
        let user_name = resolve_display_name(self.directory.as_ref(), user_id).await;
        let channel_name = resolve_channel_name(self.directory.as_ref(), channel_id).await;

        let request = AlertRequest::new(user_id, channel_id)
            .with_requester_name(user_name.clone())
            .with_channel_name(channel_name.clone())
            .with_note(note);
        let handle = self.registry.create(request);

        let confirmation = format!(
            "Alert activated! I'm now tracking activity in #{channel_name} for {}.",
            humantime::format_duration(handle.window)
        );
        self.send_direct(user_id, &confirmation).await;

        CommandResponse::in_channel(format!("Accepted alert from {user_name}."))
    }

    async fn cancel_alert(&self, user_id: &str) -> CommandResponse {
        let user_name = resolve_display_name(self.directory.as_ref(), user_id).await;

        if self.registry.cancel(user_id) {
            CommandResponse::ephemeral(format!("Alert cancelled for {user_name}."))
        } else {
            CommandResponse::ephemeral(format!("No active alert found for {user_name}."))
        }
    }

    fn list_alerts(&self, user_id: &str) -> CommandResponse {
        if self.registry.active_count() == 0 {
            return CommandResponse::ephemeral("No active alerts are currently running.");
        }

        let mine = self.registry.alerts_for(user_id);
        let noun = if mine.len() == 1 { "alert" } else { "alerts" };
        let mut lines = vec![format!("You have {} active {noun}.", mine.len())];
        for alert in &mine {
            // Whole seconds keep the output readable
            let remaining = std::time::Duration::from_secs(alert.remaining().as_secs());
            lines.push(format!(
                "• #{}: {} remaining",
                alert.channel_name,
                humantime::format_duration(remaining)
            ));
        }

        CommandResponse::ephemeral(lines.join("\n"))
    }

    async fn add_note(&self, user_id: &str, text: String) -> CommandResponse {
        if text.is_empty() {
            return CommandResponse::ephemeral("Usage: /note <text>");
        }

        let user_name = resolve_display_name(self.directory.as_ref(), user_id).await;
        self.notes.add(user_id, text);

        CommandResponse::in_channel(format!("Note added by {user_name}."))
    }

    async fn get_notes(&self, user_id: &str) -> CommandResponse {
        let user_name = resolve_display_name(self.directory.as_ref(), user_id).await;
        let notes = self.notes.get(user_id);

        let message = if notes.is_empty() {
            "You don't have any saved notes yet.".to_string()
        } else {
            let mut lines = vec![format!("Your Notes, {user_name}:")];
            lines.extend(notes.iter().enumerate().map(|(i, note)| format!("{}. {note}", i + 1)));
            lines.join("\n")
        };
        self.send_direct(user_id, &message).await;

        CommandResponse::ephemeral("Your notes are on their way to your DMs.")
    }

    async fn send_direct(&self, user_id: &str, text: &str) {
        match self.delivery.deliver(user_id, text).await {
            Ok(()) => info!(user_id = %user_id, "Direct message sent"),
            Err(e) => warn!(user_id = %user_id, error = %e, "Failed to send direct message"),
        }
    }
}
