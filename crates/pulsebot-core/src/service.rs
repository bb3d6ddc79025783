//! Service assembly: registry, deadline dispatcher, Slack client and HTTP server

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use crate::alerting::{AlertRegistry, DeadlineDispatcher, DeadlineScheduler, Directory, MessageDelivery};
use crate::api::{AppState, HttpServer};
use crate::commands::CommandHandler;
use crate::config::Config;
use crate::error::Result;
use crate::notes::NotesStore;
use crate::slack::SlackClient;

/// The running bot
pub struct Service {
    config: Config,
    registry: Arc<AlertRegistry>,
    commands: Arc<CommandHandler>,
    dispatcher: Option<DeadlineDispatcher>,
}

impl Service {
    /// Wire the bot against the Slack Web API
    pub fn new(config: Config) -> Result<Self> {
        let slack = Arc::new(SlackClient::new(&config.slack)?);
        Ok(Self::with_platform(config, slack.clone(), slack))
    }

    /// Wire the bot against arbitrary platform capabilities
    pub fn with_platform(
        config: Config,
        delivery: Arc<dyn MessageDelivery>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        let (scheduler, dispatcher) = DeadlineScheduler::new();
        let registry = Arc::new(AlertRegistry::new(
            config.alerting.window,
            scheduler,
            delivery.clone(),
        ));
        let notes = Arc::new(NotesStore::new(config.notes.max_notes));
        let commands = Arc::new(CommandHandler::new(registry.clone(), notes, directory, delivery));

        Self {
            config,
            registry,
            commands,
            dispatcher: Some(dispatcher),
        }
    }

    /// The alert registry
    pub fn registry(&self) -> Arc<AlertRegistry> {
        self.registry.clone()
    }

    /// Run the dispatcher and HTTP server until Ctrl+C
    pub async fn run(mut self) -> Result<()> {
        info!("Starting Pulsebot...");

        if self.config.slack.signing_secret.is_none() {
            info!("No Slack signing secret configured, request verification disabled");
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let dispatcher_handle = self.dispatcher.take().map(|dispatcher| {
            let registry = self.registry.clone();
            tokio::spawn(dispatcher.run(registry, shutdown_rx.clone()))
        });

        let state = AppState {
            registry: self.registry.clone(),
            commands: self.commands.clone(),
            signing_secret: self.config.slack.signing_secret.as_deref().map(Arc::from),
        };
        let server = HttpServer::new(state);

        let mut server_shutdown = shutdown_rx;
        let shutdown_signal = async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        };

        let addr = self.config.bind_addr();
        let mut server_handle = tokio::spawn(async move { server.serve(&addr, shutdown_signal).await });

        // The server only finishes on its own if it failed to start
        let finished = tokio::select! {
            result = &mut server_handle => Some(result),
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Failed to listen for Ctrl+C: {}", e);
                }
                info!(
                    active_alerts = self.registry.active_count(),
                    "Ctrl+C received, shutting down (active alerts are dropped)"
                );
                None
            }
        };
        let _ = shutdown_tx.send(true);

        if let Some(handle) = dispatcher_handle {
            let _ = handle.await;
        }

        let server_result = match finished {
            Some(result) => result,
            None => server_handle.await,
        };
        match server_result {
            Ok(result) => result?,
            Err(e) => error!("HTTP server task failed: {}", e),
        }

        info!("Pulsebot stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::testing::{RecordingDelivery, StaticDirectory};
    use crate::models::AlertRequest;
    use std::time::Duration;

    #[test]
    fn test_registry_uses_configured_window() {
        let mut config = Config::default();
        config.alerting.window = Duration::from_secs(42);

        let service = Service::with_platform(
            config,
            Arc::new(RecordingDelivery::default()),
            Arc::new(StaticDirectory::default()),
        );
        let handle = service.registry().create(AlertRequest::new("U1", "C1"));

        assert_eq!(handle.window, Duration::from_secs(42));
    }
}
