//! Colloquy CLI entry point.
//!
//! Binary name: `clq`
//!
//! Parses CLI arguments, initializes the database and config, then
//! dispatches to the appropriate command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ListResource};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,colloquy=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "clq", &mut std::io::stdout());
        return Ok(());
    }

    // Initialize application state (DB, config)
    let state = AppState::init().await?;

    match cli.command {
        Commands::New => {
            cli::chat::new_chat(&state, cli.json).await?;
        }

        Commands::Send {
            chat_id,
            text,
            model,
            no_history,
        } => {
            cli::chat::send(&state, chat_id, &text, model, no_history, cli.json).await?;
        }

        Commands::System { chat_id, text } => {
            cli::chat::system_message(&state, chat_id, &text, cli.json).await?;
        }

        Commands::History { chat_id } => {
            cli::chat::history(&state, chat_id, cli.json).await?;
        }

        Commands::List { resource } => match resource {
            ListResource::Chats => {
                cli::list::list_chats(&state, cli.json).await?;
            }
            ListResource::Calls { chat } => {
                cli::list::list_calls(&state, chat, cli.json).await?;
            }
        },

        Commands::Delete { chat_id, force } => {
            cli::chat::delete_chat(&state, chat_id, force, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
