//! sitewright CLI: the main entry point.
//!
//! Commands:
//! - `chat`: Interactive build session
//! - `ask`: Run a single request and print the result
//! - `files`: List generated files
//! - `serve`: Start the HTTP API
//! - `config`: Create, show, or locate the config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "sitewright",
    about = "sitewright: build websites by chatting with a local model",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.sitewright/config.toml
    #[arg(long, global = true, env = "SITEWRIGHT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the builder agent
    Chat {
        #[command(flatten)]
        session: commands::SessionArgs,
    },

    /// Send a single request
    Ask {
        /// What to build
        prompt: String,

        #[command(flatten)]
        session: commands::SessionArgs,
    },

    /// List files under the site directory
    Files,

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
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

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Chat { session } => commands::chat::run(config_path, session).await?,
        Commands::Ask { prompt, session } => {
            commands::ask::run(config_path, &prompt, session).await?
        }
        Commands::Files => commands::files::run(config_path).await?,
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => commands::config_cmd::init(config_path, force).await?,
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(config_path).await?,
        },
    }

    Ok(())
}
