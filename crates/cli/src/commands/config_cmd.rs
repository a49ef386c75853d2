//! `sitewright config`: Configuration management commands.

use std::path::{Path, PathBuf};

use sitewright_config::AppConfig;

use super::load_config;

fn target(config_path: Option<&Path>) -> PathBuf {
    config_path.map_or_else(AppConfig::config_path, Path::to_path_buf)
}

pub async fn init(
    config_path: Option<&Path>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = target(config_path);
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub async fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path)?;
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", target(config_path).display());
    Ok(())
}
