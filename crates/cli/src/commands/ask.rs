//! `sitewright ask`: Run one request and print the result.

use std::path::Path;

use sitewright_agent::SessionFactory;

use super::{SessionArgs, load_config};

pub async fn run(
    config_path: Option<&Path>,
    prompt: &str,
    args: SessionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let factory = SessionFactory::from_config(config)?;
    let mut agent = factory.session_with(&args.overrides())?;

    eprint!("  Building...");
    let result = agent.ask(prompt).await;
    eprint!("\r             \r");

    println!("{}", result?);
    Ok(())
}
