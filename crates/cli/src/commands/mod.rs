//! Subcommand implementations.

pub mod ask;
pub mod chat;
pub mod config_cmd;
pub mod files;
pub mod serve;

use std::path::Path;

use sitewright_agent::SessionOverrides;
use sitewright_config::AppConfig;

/// Per-session flags shared by `chat` and `ask`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Override the model name
    #[arg(short, long)]
    pub model: Option<String>,

    /// Override the model host (ex: http://ollama:11434)
    #[arg(long)]
    pub host: Option<String>,

    /// Log full model responses
    #[arg(short, long)]
    pub debug: bool,
}

impl SessionArgs {
    pub fn overrides(&self) -> SessionOverrides {
        SessionOverrides {
            model: self.model.clone(),
            host: self.host.clone(),
            debug: self.debug,
        }
    }
}

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_overrides(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}
