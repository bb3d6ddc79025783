//! Pulsebot CLI
//!
//! Command-line entry point for the Pulsebot Slack activity bot.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::info;

use pulsebot::config::LoggingConfig;
use pulsebot::service::Service;

/// Pulsebot - channel activity reports for Slack
#[derive(Parser)]
#[command(name = "pulsebot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "PULSEBOT_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot (Slack callbacks and health endpoint)
    Serve {
        /// HTTP port, overrides the configuration
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the effective configuration as JSON
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = match pulsebot::Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    init_logging(&config.logging, cli.verbose);

    // Execute command
    let result = match cli.command {
        Commands::Serve { port } => run_serve(config, port).await,
        Commands::Config => print_config(&config),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let log_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_serve(mut config: pulsebot::Config, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if config.slack.bot_token.is_empty() {
        anyhow::bail!("slack.bot_token is not set (use SLACK_BOT_TOKEN or PULSEBOT__SLACK__BOT_TOKEN)");
    }

    info!(
        addr = %config.bind_addr(),
        window = %humantime::format_duration(config.alerting.window),
        "Starting Pulsebot"
    );

    Service::new(config)?.run().await?;
    Ok(())
}

fn print_config(config: &pulsebot::Config) -> anyhow::Result<()> {
    let mut redacted = config.clone();
    if !redacted.slack.bot_token.is_empty() {
        redacted.slack.bot_token = "<redacted>".to_string();
    }
    if redacted.slack.signing_secret.is_some() {
        redacted.slack.signing_secret = Some("<redacted>".to_string());
    }

    println!("{}", serde_json::to_string_pretty(&redacted)?);
    Ok(())
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "pulsebot", &mut io::stdout());
}
