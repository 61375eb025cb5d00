//! Questkeeper CLI — the main entry point.
//!
//! Commands:
//! - `chat`   — Interactive campaign session or single-message mode
//! - `tools`  — List the available campaign tools
//! - `status` — Show resolved configuration and world counts

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "questkeeper",
    about = "Questkeeper — AI quest and NPC management for tabletop campaigns",
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
    /// Chat with the campaign assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List the available campaign tools
    Tools,

    /// Show configuration and world status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Chat { message } => commands::chat::run(message).await?,
        Commands::Tools => commands::tools::run().await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
