//! `sitewright chat`: Interactive build session.
//!
//! One session spans the whole chat, so follow-up requests see earlier
//! turns. Tool calls are printed as they run.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use sitewright_agent::SessionFactory;
use sitewright_core::event::{DomainEvent, EventBus};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use super::{SessionArgs, load_config};

const BAR_WIDTH: usize = 68;

/// What a line typed at the prompt asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Skip,
    Quit,
    Help,
    Request(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Skip;
    }
    match line.to_lowercase().as_str() {
        "exit" | "quit" | "/quit" | "/q" => Input::Quit,
        "help" | "/help" => Input::Help,
        _ => Input::Request(line),
    }
}

pub async fn run(
    config_path: Option<&Path>,
    args: SessionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let factory = SessionFactory::from_config(config)?;
    let overrides = args.overrides();

    let bus = Arc::new(EventBus::default());
    let mut agent = factory.session_with(&overrides)?.with_event_bus(bus.clone());
    spawn_progress_printer(&bus);

    let host = overrides.host.as_deref().unwrap_or(&factory.config().host);
    print_banner(&agent.settings().model, host, args.debug, factory.retriever_name());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("prompt> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!("\nGoodbye.");
            break;
        };

        match classify(&line) {
            Input::Skip => continue,
            Input::Quit => {
                println!("Goodbye.");
                break;
            }
            Input::Help => print_help(),
            Input::Request(request) => match agent.ask(request).await {
                Ok(result) if !result.is_empty() => println!("\nResult: {result}\n"),
                Ok(_) => println!(),
                Err(e) => eprintln!("\n  [Error] {e}\n"),
            },
        }
    }

    Ok(())
}

fn spawn_progress_printer(bus: &EventBus) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            match event.as_ref() {
                DomainEvent::ToolExecuted { tool_name, success, duration_ms, .. } => {
                    let mark = if *success { "ok" } else { "failed" };
                    eprintln!("  · {tool_name} ({mark}, {duration_ms} ms)");
                }
                DomainEvent::LoopStalled { iterations, .. } => {
                    eprintln!("  · stopped after {iterations} round trips");
                }
                _ => {}
            }
        }
    });
}

fn print_banner(model: &str, host: &str, debug: bool, retriever: &str) {
    let bar = "=".repeat(BAR_WIDTH);
    println!("\n{bar}");
    println!("{:^BAR_WIDTH$}", " sitewright builder ");
    println!("{bar}");
    println!(
        "Model: {model} | Host: {host} | Grounding: {retriever} | Response logging: {}",
        if debug { "on" } else { "off" }
    );
    println!("\nType a request (ex: Create a simple landing page)");
    println!("Commands: /help to see tips, /quit to exit\n");
}

fn print_help() {
    println!("Quick commands:");
    println!("  /help   show this message");
    println!("  /quit   exit the CLI");
    println!();
    println!("Examples:");
    println!("  prompt> Build a two-page portfolio with a contact form");
    println!("  prompt> Add a CTA section with a button and background image");
}
