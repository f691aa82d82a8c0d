//! hudgate CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Write a starter config file
//! - `serve`   — Start the HTTP gateway
//! - `doctor`  — Diagnose configuration and upstream reachability

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "hudgate",
    about = "hudgate — streaming gateway for a HUD conversational agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file
    Onboard,

    /// Start the HTTP gateway server
    Serve {
        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the upstream provider ("ollama" or "deepseek")
        #[arg(long)]
        provider: Option<String>,
    },

    /// Diagnose configuration and upstream reachability
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Serve { port, provider } => commands::serve::run(port, provider).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
