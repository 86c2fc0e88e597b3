//! Groundcrew CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Start the HTTP gateway
//! - `config`  — Print the effective configuration

use clap::{Parser, Subcommand};
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "groundcrew",
    about = "Groundcrew — RAG orchestration service",
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
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the effective configuration (secrets redacted)
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
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
        Commands::Serve { port } => {
            let mut config = groundcrew_config::AppConfig::load()?;
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if !config.has_api_key() {
                warn!("No backend API key configured — completion requests will be rejected");
            }
            groundcrew_gateway::start(config)
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        Commands::Config => {
            let config = groundcrew_config::AppConfig::load()?;
            println!("{config:#?}");
        }
    }

    Ok(())
}
