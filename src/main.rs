//! VidSage CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vidsage::cli::{commands, Cli, Commands};
use vidsage::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::load_from(cli.config.as_ref())?;

    // Initialize logging; the server follows the config file unless -v is given
    let log_level = match cli.verbose {
        0 if matches!(cli.command, Commands::Serve { .. }) => settings.general.log_level.as_str(),
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("vidsage={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Ask {
            video,
            question,
            transcript_file,
        } => {
            commands::run_ask(video, question, transcript_file.as_deref(), settings).await?;
        }

        Commands::Chat {
            video,
            transcript_file,
        } => {
            commands::run_chat(video, transcript_file.as_deref(), settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, cli.config.as_ref(), settings)?;
        }
    }

    Ok(())
}
