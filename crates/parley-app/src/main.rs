//! Parley binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Load the gazetteer (custom file or built-in table)
//! 3. Build and health-check the generation backend
//! 4. Run the interactive chat loop on stdin/stdout

mod cli;
mod command;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use parley_chat::{ChatSession, Gazetteer, GeneratorBackend};
use parley_core::config::ParleyConfig;

use cli::CliArgs;
use command::{Command, HELP_TEXT};

fn load_gazetteer(config: &ParleyConfig) -> parley_core::Result<Gazetteer> {
    match config.knowledge.gazetteer_path {
        Some(ref path) => Gazetteer::load(Path::new(path)),
        None => Ok(Gazetteer::builtin()),
    }
}

fn prompt_user() -> std::io::Result<()> {
    print!("User: ");
    std::io::stdout().flush()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Loaded before tracing is installed, so failures are printed directly.
    let config_file = args.resolve_config_path();
    let (config, first_run) = match args.load_config(&config_file) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Invalid configuration in {}: {}", config_file.display(), e);
            return Err(e.into());
        }
    };

    // Tracing. Logs go to stderr so they never interleave with replies.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), created = first_run, "Configuration loaded");

    // Knowledge.
    let gazetteer = load_gazetteer(&config)?;
    tracing::info!(topics = gazetteer.len(), "Gazetteer ready");

    // Generation backend.
    let backend = GeneratorBackend::from_config(&config.generation)?;
    if let Err(e) = backend.health_check().await {
        tracing::error!(
            backend = backend.name(),
            endpoint = %config.generation.endpoint,
            model = %config.generation.model,
            error = %e,
            "Generation backend is not usable"
        );
        eprintln!(
            "Could not load model '{}' from {}: {}",
            config.generation.model, config.generation.endpoint, e
        );
        eprintln!("Start the server or run with --offline.");
        return Err(e.into());
    }
    let backend_name = backend.name();

    let mut session = ChatSession::from_config(&config, Arc::new(gazetteer), backend);
    tracing::info!(
        session_id = %session.id(),
        backend = backend_name,
        memory_turns = config.memory.max_turns,
        "Session started"
    );

    println!("Parley v{} ({} backend)", env!("CARGO_PKG_VERSION"), backend_name);
    println!("{}", HELP_TEXT);
    println!("Start chatting! (Type /exit to quit)\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt_user()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!("\nGoodbye!");
                break;
            }
        };

        let Some(line) = line else {
            println!("\nGoodbye!");
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = Command::parse(input) {
            match command {
                Command::Exit => {
                    println!("Goodbye!");
                    break;
                }
                Command::Clear => {
                    session.clear();
                    println!("Conversation history cleared.\n");
                }
                Command::Help => println!("{}\n", HELP_TEXT),
                Command::Unknown(name) => {
                    println!("Unknown command: {}. Type /help for available commands.\n", name);
                }
            }
            continue;
        }

        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(prompt = %session.prompt_for(input), "Prompt context");
        }

        // Ctrl-C while a reply is pending drops the in-flight generation.
        let reply = tokio::select! {
            reply = session.respond(input) => reply,
            _ = tokio::signal::ctrl_c() => {
                println!("\nInterrupted. Goodbye!");
                break;
            }
        };

        println!("Bot: {}\n", reply.text);
    }

    tracing::info!(
        session_id = %session.id(),
        turns = session.history().len(),
        "Session ended"
    );

    Ok(())
}
