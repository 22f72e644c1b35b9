//! Sitewise CLI entry point.

use anyhow::Result;
use clap::Parser;
use sitewise::cli::{commands, Cli, Commands};
use sitewise::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("sitewise={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    std::fs::create_dir_all(settings.data_dir())?;

    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings, config_path.as_deref())?;
        }

        Commands::Index { dir, output } => {
            commands::run_index(dir, output.clone(), settings).await?;
        }

        Commands::IndexGlobal { dir, output } => {
            commands::run_index_global(dir, output.clone(), settings).await?;
        }

        Commands::ToolIndex { index_dir } => {
            commands::run_tool_index(index_dir, settings).await?;
        }

        Commands::Tools { index_dir } => {
            commands::run_tools(index_dir, settings)?;
        }

        Commands::Ask { query, agent } => {
            commands::run_ask(query, *agent, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
