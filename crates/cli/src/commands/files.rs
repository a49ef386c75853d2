//! `sitewright files`: List generated files.

use std::path::Path;

use sitewright_agent::SessionFactory;

use super::load_config;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let factory = SessionFactory::from_config(config)?;
    let site = factory.site();

    let files = site.list_files(Some(site.output_dir())).await?;
    if files.is_empty() {
        println!("No files under {}/ yet.", site.output_dir());
    }
    for file in files {
        println!("{file}");
    }
    Ok(())
}
