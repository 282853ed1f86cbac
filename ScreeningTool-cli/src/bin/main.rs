use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use screening_tool_cli::{run, AppConfig, Cli};
use screening_tool_domain::services::{create_screening_service, ScreeningServiceTrait};

/// The main entry point for the screening tool
///
/// This function:
/// 1. Initializes environment variables from .env file
/// 2. Sets up tracing for logging
/// 3. Ensures the data directory exists
/// 4. Loads the data file
/// 5. Runs the requested subcommand
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    let dotenv_loaded = dotenv().is_ok();

    // Initialize tracing for structured logging; stdout is reserved for command output
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .with(env_filter)
        .init();

    if !dotenv_loaded {
        debug!(".env file not found or couldn't be read. Using environment variables.");
    }

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    // Create the data directory if it doesn't exist
    if !config.data_dir.exists() {
        info!("Creating data directory: {}", config.data_dir.display());
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create data directory {}", config.data_dir.display())
        })?;
    }

    let service = create_screening_service(config.data_path());
    let report = service.load().await;
    if let Some(warning) = &report.warning {
        eprintln!("Warning: {}", warning);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(cli.command, &service, &config, &mut out).await
}
