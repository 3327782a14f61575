//! AIKA CLI — the main entry point.
//!
//! Commands:
//! - `chat`     — Interactive session or single-message mode (the default)
//! - `onboard`  — Write a starter config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "aika",
    about = "AIKA — a terminal AI agent with web research and file tools",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with AIKA (interactive unless -m is given)
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Write a starter configuration file
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // Bare `aika` drops straight into an interactive session.
    match cli.command {
        Some(Commands::Onboard) => commands::onboard::run().await?,
        Some(Commands::Chat { message }) => commands::chat::run(message).await?,
        None => commands::chat::run(None).await?,
    }

    Ok(())
}
