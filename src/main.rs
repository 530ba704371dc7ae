//! PdfChat - terminal client for a PDF question-answering service
//!
#![doc = "Main entry point for the PdfChat application."]

use anyhow::Result;

use pdfchat::cli::{Cli, Commands};
use pdfchat::commands;
use pdfchat::config::Config;
use pdfchat::error::user_message;
use pdfchat::logging::init_logging;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", user_message(&e));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let (config, warnings) = Config::load_with_warnings(config_path, &cli)?;

    // Initialize tracing, then replay what loading had to say
    init_logging(&config.logging)?;
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat => {
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Ask {
            file,
            question,
            email,
            password,
        } => {
            tracing::info!("Running one-shot question");
            tracing::debug!("Uploading {}", file.display());
            commands::ask::run_ask(config, &file, &question, &email, &password).await?;
            Ok(())
        }
        Commands::Signup { email, password } => {
            tracing::info!("Registering {}", email);
            commands::signup::run_signup(config, &email, &password).await?;
            Ok(())
        }
        Commands::Health => {
            tracing::info!("Checking backend health");
            commands::health::run_health(config).await?;
            Ok(())
        }
    }
}
